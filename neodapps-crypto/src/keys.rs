//! secp256r1 key pairs and Neo N3 addresses

use p256::{
    ecdsa::{
        signature::{Signer, Verifier},
        Signature, SigningKey, VerifyingKey,
    },
    elliptic_curve::sec1::ToEncodedPoint,
    SecretKey,
};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::error::{CryptoError, Result};

const WIF_PREFIX: u8 = 0x80;
const WIF_COMPRESSED: u8 = 0x01;

// PUSHDATA1 33 <pubkey> SYSCALL System.Crypto.CheckSig
const PUSHDATA1: u8 = 0x0c;
const SYSCALL: u8 = 0x41;
const CHECKSIG_HASH: [u8; 4] = [0x56, 0xe7, 0xb3, 0x27];

#[derive(Clone)]
pub struct KeyPair {
    secret: SecretKey,
}

impl KeyPair {
    pub fn from_private_key(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 32 {
            return Err(CryptoError::InvalidPrivateKey(format!(
                "expected 32 bytes, got {}",
                bytes.len()
            )));
        }
        let secret = SecretKey::from_slice(bytes)
            .map_err(|_| CryptoError::InvalidPrivateKey("scalar out of range".into()))?;
        Ok(Self { secret })
    }

    /// neo-express stores keys as plain hex.
    pub fn from_hex(key: &str) -> Result<Self> {
        let bytes = Zeroizing::new(
            hex::decode(key.trim()).map_err(|e| CryptoError::InvalidPrivateKey(e.to_string()))?,
        );
        Self::from_private_key(&bytes)
    }

    pub fn from_wif(wif: &str) -> Result<Self> {
        let data = Zeroizing::new(
            bs58::decode(wif)
                .with_check(None)
                .into_vec()
                .map_err(|e| CryptoError::InvalidWif(e.to_string()))?,
        );
        if data.len() != 34 || data[0] != WIF_PREFIX || data[33] != WIF_COMPRESSED {
            return Err(CryptoError::InvalidWif("unexpected layout".into()));
        }
        Self::from_private_key(&data[1..33])
    }

    pub fn private_key(&self) -> Zeroizing<[u8; 32]> {
        let mut out = Zeroizing::new([0u8; 32]);
        out.copy_from_slice(&self.secret.to_bytes());
        out
    }

    pub fn to_wif(&self) -> Zeroizing<String> {
        let mut data = Zeroizing::new(Vec::with_capacity(34));
        data.push(WIF_PREFIX);
        data.extend_from_slice(&self.private_key()[..]);
        data.push(WIF_COMPRESSED);
        Zeroizing::new(bs58::encode(&data[..]).with_check().into_string())
    }

    /// Compressed SEC1 public key.
    pub fn public_key(&self) -> [u8; 33] {
        let point = self.secret.public_key().to_encoded_point(true);
        let mut out = [0u8; 33];
        out.copy_from_slice(point.as_bytes());
        out
    }

    pub fn verification_script(&self) -> Vec<u8> {
        let mut script = Vec::with_capacity(40);
        script.push(PUSHDATA1);
        script.push(33);
        script.extend_from_slice(&self.public_key());
        script.push(SYSCALL);
        script.extend_from_slice(&CHECKSIG_HASH);
        script
    }

    pub fn script_hash(&self) -> [u8; 20] {
        hash160(&self.verification_script())
    }

    pub fn address(&self, version: u8) -> String {
        script_hash_to_address(&self.script_hash(), version)
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        let signature: Signature = SigningKey::from(&self.secret).sign(message);
        let mut out = [0u8; 64];
        out.copy_from_slice(&signature.to_bytes());
        out
    }

    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        let Ok(signature) = Signature::from_slice(signature) else {
            return false;
        };
        VerifyingKey::from(&SigningKey::from(&self.secret))
            .verify(message, &signature)
            .is_ok()
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &hex::encode(self.public_key()))
            .finish()
    }
}

pub(crate) fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

fn hash160(data: &[u8]) -> [u8; 20] {
    Ripemd160::digest(sha256(data)).into()
}

pub fn script_hash_to_address(script_hash: &[u8; 20], version: u8) -> String {
    let mut data = Vec::with_capacity(21);
    data.push(version);
    data.extend_from_slice(script_hash);
    bs58::encode(data).with_check().into_string()
}

/// Script hash as nodes print it: `0x`-prefixed, most significant byte first.
pub fn script_hash_to_hex(script_hash: &[u8; 20]) -> String {
    let mut reversed = *script_hash;
    reversed.reverse();
    format!("0x{}", hex::encode(reversed))
}

pub fn address_to_script_hash(address: &str, version: u8) -> Result<[u8; 20]> {
    let data = bs58::decode(address)
        .with_check(None)
        .into_vec()
        .map_err(|e| CryptoError::InvalidAddress(e.to_string()))?;
    if data.len() != 21 {
        return Err(CryptoError::InvalidAddress(format!("{address}: bad length")));
    }
    if data[0] != version {
        return Err(CryptoError::InvalidAddress(format!(
            "{address}: version {} != {version}",
            data[0]
        )));
    }
    let mut hash = [0u8; 20];
    hash.copy_from_slice(&data[1..]);
    Ok(hash)
}
