//! Wallets visible for a chain
//!
//! Private chain wallets are rebuilt from the hex keys in the neo-express
//! config every time they are asked for. Public chain wallets exist only
//! when imported, and live in memory for the session, keyed by the network
//! magic of the chain's selected node.
//!
//! Exposed account keys are always NEP-2 encrypted with
//! [`EXPRESS_WALLET_PASSWORD`]. The password only satisfies the wallet
//! format; the same keys sit in plain text in the neo-express config.

use neodapps_chain::{Chain, PrivateChain, DEFAULT_ADDRESS_VERSION};
use neodapps_crypto::{address_to_script_hash, KeyPair, Nep6Account, Nep6Wallet, ScryptParams};
use neodapps_rpc::{Nep17Balances, NodeRpc, RpcClient};
use parking_lot::Mutex;
use std::{collections::HashMap, path::Path, sync::Arc, time::Duration};
use tracing::{debug, info};

use crate::error::{Result, SessionError};

pub const EXPRESS_WALLET_PASSWORD: &str = "NEO";

const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(5);

/// NEP-17 balances of every account of one wallet.
#[derive(Clone, Debug, PartialEq)]
pub struct WalletBalances {
    pub wallet: String,
    pub accounts: Vec<Nep17Balances>,
}

pub struct WalletService {
    rpc: Arc<dyn NodeRpc>,
    scrypt: ScryptParams,
    rpc_timeout: Duration,
    imported: Mutex<HashMap<u32, Vec<Nep6Wallet>>>,
}

impl WalletService {
    pub fn new(rpc: Arc<dyn NodeRpc>) -> Self {
        Self::with_scrypt(rpc, ScryptParams::default())
    }

    /// Scrypt cost used when encrypting private chain accounts.
    pub fn with_scrypt(rpc: Arc<dyn NodeRpc>, scrypt: ScryptParams) -> Self {
        Self {
            rpc,
            scrypt,
            rpc_timeout: DEFAULT_RPC_TIMEOUT,
            imported: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_rpc_timeout(mut self, rpc_timeout: Duration) -> Self {
        self.rpc_timeout = rpc_timeout;
        self
    }

    pub async fn get_wallets(&self, chain: &Chain) -> Result<Vec<Nep6Wallet>> {
        match chain {
            Chain::Private(private) => self.express_wallets(private),
            Chain::Public(_) => {
                let magic = self.public_magic(chain).await?;
                Ok(self.imported.lock().get(&magic).cloned().unwrap_or_default())
            }
        }
    }

    /// Parses a NEP-6 file, renames it to `name` and adds it to the wallets
    /// of a public chain. Private chains take their wallets from neo-express.
    pub async fn import_nep6(&self, chain: &Chain, name: &str, path: &Path) -> Result<Nep6Wallet> {
        let mut wallet = Nep6Wallet::from_file(path).map_err(|e| SessionError::WalletImport {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        if matches!(chain, Chain::Private(_)) {
            return Err(SessionError::WalletImport {
                path: path.to_path_buf(),
                reason: format!("{chain} is a neo-express chain; create wallets with neo-express"),
            });
        }
        wallet.name = Some(name.to_string());

        let magic = self.public_magic(chain).await?;
        self.imported
            .lock()
            .entry(magic)
            .or_default()
            .push(wallet.clone());
        info!(name, magic, accounts = wallet.accounts.len(), "imported wallet");
        Ok(wallet)
    }

    /// Decrypts the key of `address` right before it is used.
    pub async fn signing_key(&self, chain: &Chain, address: &str) -> Result<KeyPair> {
        let version = self.address_version(chain)?;
        for wallet in self.get_wallets(chain).await? {
            if let Some(account) = wallet.account(address) {
                return Ok(account.decrypt(EXPRESS_WALLET_PASSWORD, version, wallet.scrypt)?);
            }
        }
        Err(SessionError::UnknownAccount(address.to_string()))
    }

    /// Script hash of `address` under the chain's address version.
    pub fn script_hash(&self, chain: &Chain, address: &str) -> Result<[u8; 20]> {
        Ok(address_to_script_hash(address, self.address_version(chain)?)?)
    }

    /// Asks the selected node for the NEP-17 balances of every wallet account.
    pub async fn get_token_balances(&self, chain: &Chain) -> Result<Vec<WalletBalances>> {
        let client = RpcClient::new(chain.selected_node()?.rpc_url(), self.rpc_timeout)?;
        let wallets = self.get_wallets(chain).await?;

        let mut balances = Vec::with_capacity(wallets.len());
        for wallet in wallets {
            let mut accounts = Vec::with_capacity(wallet.accounts.len());
            for account in &wallet.accounts {
                accounts.push(client.get_nep17_balances(&account.address).await?);
            }
            balances.push(WalletBalances {
                wallet: wallet.name.unwrap_or_default(),
                accounts,
            });
        }
        debug!(chain = %chain, wallets = balances.len(), "fetched token balances");
        Ok(balances)
    }

    fn express_wallets(&self, chain: &PrivateChain) -> Result<Vec<Nep6Wallet>> {
        let config = chain.config()?;
        let version = config.address_version;

        let mut wallets = Vec::with_capacity(config.wallets.len());
        for express in &config.wallets {
            let mut wallet = Nep6Wallet::new(&express.name, self.scrypt);
            for account in &express.accounts {
                let key = KeyPair::from_hex(&account.private_key)?;
                let mut nep6 = Nep6Account::from_key_pair(
                    &key,
                    account.label.clone(),
                    EXPRESS_WALLET_PASSWORD,
                    version,
                    self.scrypt,
                )?;
                nep6.is_default = account.is_default;
                wallet.accounts.push(nep6);
            }
            wallets.push(wallet);
        }
        debug!(chain = %chain.name(), wallets = wallets.len(), "derived neo-express wallets");
        Ok(wallets)
    }

    fn address_version(&self, chain: &Chain) -> Result<u8> {
        match chain {
            Chain::Private(private) => Ok(private.config()?.address_version),
            Chain::Public(_) => Ok(DEFAULT_ADDRESS_VERSION),
        }
    }

    async fn public_magic(&self, chain: &Chain) -> Result<u32> {
        let node = chain.selected_node()?;
        Ok(self.rpc.network_magic(&node.rpc_url()).await?)
    }
}
