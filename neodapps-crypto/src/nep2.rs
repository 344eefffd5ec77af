//! NEP-2 passphrase-protected private keys

use aes::{
    cipher::{generic_array::GenericArray, BlockDecrypt, BlockEncrypt, KeyInit},
    Aes256,
};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::{CryptoError, Result};
use crate::keys::{sha256, KeyPair};

const NEP2_PREFIX: [u8; 3] = [0x01, 0x42, 0xe0];
const NEP2_LEN: usize = 39;

/// Scrypt cost parameters, serialized as the NEP-6 `scrypt` object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScryptParams {
    pub n: u32,
    pub r: u32,
    pub p: u32,
}

impl Default for ScryptParams {
    fn default() -> Self {
        Self { n: 16384, r: 8, p: 8 }
    }
}

impl ScryptParams {
    fn derive(&self, passphrase: &str, salt: &[u8]) -> Result<Zeroizing<[u8; 64]>> {
        if self.n < 2 || !self.n.is_power_of_two() {
            return Err(CryptoError::Scrypt(format!("n={} is not a power of two", self.n)));
        }
        let params = scrypt::Params::new(self.n.trailing_zeros() as u8, self.r, self.p, 64)
            .map_err(|e| CryptoError::Scrypt(e.to_string()))?;
        let mut out = Zeroizing::new([0u8; 64]);
        scrypt::scrypt(passphrase.as_bytes(), salt, &params, &mut out[..])
            .map_err(|e| CryptoError::Scrypt(e.to_string()))?;
        Ok(out)
    }
}

fn address_hash(key: &KeyPair, version: u8) -> [u8; 4] {
    let digest = sha256(&sha256(key.address(version).as_bytes()));
    [digest[0], digest[1], digest[2], digest[3]]
}

pub fn encrypt(key: &KeyPair, passphrase: &str, version: u8, params: ScryptParams) -> Result<String> {
    let salt = address_hash(key, version);
    let derived = params.derive(passphrase, &salt)?;

    let mut block = key.private_key();
    for (b, d) in block.iter_mut().zip(derived[..32].iter()) {
        *b ^= d;
    }
    let cipher = Aes256::new(GenericArray::from_slice(&derived[32..]));
    for chunk in block.chunks_exact_mut(16) {
        cipher.encrypt_block(GenericArray::from_mut_slice(chunk));
    }

    let mut payload = Vec::with_capacity(NEP2_LEN);
    payload.extend_from_slice(&NEP2_PREFIX);
    payload.extend_from_slice(&salt);
    payload.extend_from_slice(&block[..]);
    Ok(bs58::encode(payload).with_check().into_string())
}

pub fn decrypt(nep2: &str, passphrase: &str, version: u8, params: ScryptParams) -> Result<KeyPair> {
    let data = bs58::decode(nep2)
        .with_check(None)
        .into_vec()
        .map_err(|e| CryptoError::InvalidNep2(e.to_string()))?;
    if data.len() != NEP2_LEN || data[..3] != NEP2_PREFIX {
        return Err(CryptoError::InvalidNep2("unexpected layout".into()));
    }
    let salt = &data[3..7];
    let derived = params.derive(passphrase, salt)?;

    let mut block = Zeroizing::new([0u8; 32]);
    block.copy_from_slice(&data[7..]);
    let cipher = Aes256::new(GenericArray::from_slice(&derived[32..]));
    for chunk in block.chunks_exact_mut(16) {
        cipher.decrypt_block(GenericArray::from_mut_slice(chunk));
    }
    for (b, d) in block.iter_mut().zip(derived[..32].iter()) {
        *b ^= d;
    }

    let key = KeyPair::from_private_key(&block[..]).map_err(|_| CryptoError::WrongPassphrase)?;
    if address_hash(&key, version) != salt {
        return Err(CryptoError::WrongPassphrase);
    }
    Ok(key)
}

pub fn is_nep2(key: &str) -> bool {
    bs58::decode(key)
        .with_check(None)
        .into_vec()
        .map(|d| d.len() == NEP2_LEN && d[..3] == NEP2_PREFIX)
        .unwrap_or(false)
}

#[cfg(test)]
pub(crate) const TEST_SCRYPT: ScryptParams = ScryptParams { n: 2, r: 1, p: 1 };
