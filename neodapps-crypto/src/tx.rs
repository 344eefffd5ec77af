//! Neo N3 transactions signed by a single standard account
//!
//! Only what invoking a contract needs: the wire encoding, the hash, the data a
//! witness signs and signature witnesses. Transaction attributes are never
//! written.

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::keys::{sha256, KeyPair};

const PUSHDATA1: u8 = 0x0c;

/// Blocks a transaction stays valid for when the node does not say.
pub const DEFAULT_MAX_VALID_UNTIL_BLOCK_INCREMENT: u32 = 5760;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum WitnessScope {
    None = 0x00,
    CalledByEntry = 0x01,
    Global = 0x80,
}

impl WitnessScope {
    /// Name used by the JSON-RPC signer objects.
    pub fn as_str(&self) -> &'static str {
        match self {
            WitnessScope::None => "None",
            WitnessScope::CalledByEntry => "CalledByEntry",
            WitnessScope::Global => "Global",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signer {
    pub account: [u8; 20],
    pub scopes: WitnessScope,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Witness {
    pub invocation: Vec<u8>,
    pub verification: Vec<u8>,
}

impl Witness {
    /// Verification script only; fee calculation needs it to price the check.
    pub fn unsigned(key: &KeyPair) -> Self {
        Self {
            invocation: Vec::new(),
            verification: key.verification_script(),
        }
    }

    fn signature(key: &KeyPair, signature: &[u8; 64]) -> Self {
        let mut invocation = Vec::with_capacity(66);
        invocation.push(PUSHDATA1);
        invocation.push(64);
        invocation.extend_from_slice(signature);
        Self {
            invocation,
            verification: key.verification_script(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub version: u8,
    pub nonce: u32,
    /// GAS fractions, 10^-8.
    pub system_fee: i64,
    pub network_fee: i64,
    pub valid_until_block: u32,
    pub signers: Vec<Signer>,
    pub script: Vec<u8>,
    pub witnesses: Vec<Witness>,
}

impl Transaction {
    pub fn new(script: Vec<u8>, signers: Vec<Signer>, nonce: u32, valid_until_block: u32) -> Self {
        Self {
            version: 0,
            nonce,
            system_fee: 0,
            network_fee: 0,
            valid_until_block,
            signers,
            script,
            witnesses: Vec::new(),
        }
    }

    /// Everything but the witnesses; this is what gets hashed.
    pub fn unsigned_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(64 + self.script.len() + 21 * self.signers.len());
        out.push(self.version);
        out.extend_from_slice(&self.nonce.to_le_bytes());
        out.extend_from_slice(&self.system_fee.to_le_bytes());
        out.extend_from_slice(&self.network_fee.to_le_bytes());
        out.extend_from_slice(&self.valid_until_block.to_le_bytes());
        write_var_int(&mut out, self.signers.len() as u64);
        for signer in &self.signers {
            out.extend_from_slice(&signer.account);
            out.push(signer.scopes as u8);
        }
        // attributes
        write_var_int(&mut out, 0);
        write_var_bytes(&mut out, &self.script);
        out
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = self.unsigned_bytes();
        write_var_int(&mut out, self.witnesses.len() as u64);
        for witness in &self.witnesses {
            write_var_bytes(&mut out, &witness.invocation);
            write_var_bytes(&mut out, &witness.verification);
        }
        out
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.to_bytes())
    }

    pub fn hash(&self) -> [u8; 32] {
        sha256(&self.unsigned_bytes())
    }

    /// Hash as nodes print it: `0x`-prefixed, most significant byte first.
    pub fn hash_string(&self) -> String {
        let mut hash = self.hash();
        hash.reverse();
        format!("0x{}", hex::encode(hash))
    }

    pub fn sign_data(&self, network: u32) -> Vec<u8> {
        sign_data(network, &self.unsigned_bytes())
    }

    /// Replaces the witnesses with a signature of `key` over this transaction
    /// on `network`.
    pub fn sign(&mut self, key: &KeyPair, network: u32) {
        let signature = key.sign(&self.sign_data(network));
        self.witnesses = vec![Witness::signature(key, &signature)];
    }
}

/// Network magic followed by the transaction hash.
pub fn sign_data(network: u32, unsigned: &[u8]) -> Vec<u8> {
    let mut data = Vec::with_capacity(36);
    data.extend_from_slice(&network.to_le_bytes());
    data.extend_from_slice(&sha256(unsigned));
    data
}

fn write_var_int(out: &mut Vec<u8>, value: u64) {
    if value < 0xfd {
        out.push(value as u8);
    } else if value <= 0xffff {
        out.push(0xfd);
        out.extend_from_slice(&(value as u16).to_le_bytes());
    } else if value <= 0xffff_ffff {
        out.push(0xfe);
        out.extend_from_slice(&(value as u32).to_le_bytes());
    } else {
        out.push(0xff);
        out.extend_from_slice(&value.to_le_bytes());
    }
}

fn write_var_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    write_var_int(out, bytes.len() as u64);
    out.extend_from_slice(bytes);
}
