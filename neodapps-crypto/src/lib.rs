//! neodapps-crypto: key material for local Neo N3 development wallets.
//! - `KeyPair`: secp256r1 keys, verification scripts, script hashes and addresses
//! - `nep2`: passphrase encryption of private keys (scrypt + AES-256)
//! - `nep6`: the NEP-6 wallet document shape used for import and export
//! - `tx`: N3 transaction encoding and single-signature witnesses

pub mod error;
pub mod keys;
pub mod nep2;
pub mod nep6;
pub mod tx;

pub use error::{CryptoError, Result};
pub use keys::{address_to_script_hash, script_hash_to_address, script_hash_to_hex, KeyPair};
pub use nep2::ScryptParams;
pub use nep6::{Nep6Account, Nep6Contract, Nep6Parameter, Nep6Wallet};
pub use tx::{Signer, Transaction, Witness, WitnessScope};
