//! NEP-6 wallet documents

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{fs, path::Path};

use crate::error::{CryptoError, Result};
use crate::keys::KeyPair;
use crate::nep2::{self, ScryptParams};

pub const NEP6_VERSION: &str = "1.0";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Nep6Wallet {
    #[serde(default)]
    pub name: Option<String>,
    pub version: String,
    #[serde(default)]
    pub scrypt: ScryptParams,
    #[serde(default)]
    pub accounts: Vec<Nep6Account>,
    #[serde(default)]
    pub extra: Option<Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Nep6Account {
    pub address: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub lock: bool,
    /// NEP-2 encrypted private key; absent for watch-only accounts.
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub contract: Option<Nep6Contract>,
    #[serde(default)]
    pub extra: Option<Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Nep6Contract {
    /// Base64 verification script.
    pub script: String,
    #[serde(default)]
    pub parameters: Vec<Nep6Parameter>,
    #[serde(default)]
    pub deployed: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Nep6Parameter {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl Nep6Wallet {
    pub fn new(name: impl Into<String>, scrypt: ScryptParams) -> Self {
        Self {
            name: Some(name.into()),
            version: NEP6_VERSION.to_string(),
            scrypt,
            accounts: Vec::new(),
            extra: None,
        }
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json_pretty()?)?;
        Ok(())
    }

    /// The account flagged `isDefault`, or the first one.
    pub fn default_account(&self) -> Option<&Nep6Account> {
        self.accounts
            .iter()
            .find(|a| a.is_default)
            .or_else(|| self.accounts.first())
    }

    pub fn account(&self, address: &str) -> Option<&Nep6Account> {
        self.accounts.iter().find(|a| a.address == address)
    }

    pub fn is_encrypted(&self) -> bool {
        self.accounts
            .iter()
            .filter_map(|a| a.key.as_deref())
            .all(nep2::is_nep2)
    }
}

impl Nep6Account {
    /// Builds a single-signature account whose key is NEP-2 encrypted with
    /// `passphrase`.
    pub fn from_key_pair(
        key: &KeyPair,
        label: Option<String>,
        passphrase: &str,
        version: u8,
        scrypt: ScryptParams,
    ) -> Result<Self> {
        Ok(Self {
            address: key.address(version),
            label,
            is_default: false,
            lock: false,
            key: Some(nep2::encrypt(key, passphrase, version, scrypt)?),
            contract: Some(Nep6Contract {
                script: STANDARD.encode(key.verification_script()),
                parameters: vec![Nep6Parameter {
                    name: "signature".to_string(),
                    kind: "Signature".to_string(),
                }],
                deployed: false,
            }),
            extra: None,
        })
    }

    pub fn decrypt(&self, passphrase: &str, version: u8, scrypt: ScryptParams) -> Result<KeyPair> {
        let nep2 = self
            .key
            .as_deref()
            .ok_or_else(|| CryptoError::MissingKey(self.address.clone()))?;
        let key = nep2::decrypt(nep2, passphrase, version, scrypt)?;
        if key.address(version) != self.address {
            return Err(CryptoError::InvalidAddress(format!(
                "{} does not match its key",
                self.address
            )));
        }
        Ok(key)
    }

    pub fn verification_script(&self) -> Option<Vec<u8>> {
        self.contract
            .as_ref()
            .and_then(|c| STANDARD.decode(&c.script).ok())
    }
}
