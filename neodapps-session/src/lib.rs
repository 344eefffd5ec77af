//! neodapps-session: everything one open project needs, in one place
//!
//! A [`Session`] owns the project's chain list and selection, the wallet,
//! contract and block services, the liveness probe and the neo-express
//! actions. Services talk to each other through the session's [`EventBus`].

pub mod blocks;
pub mod chains;
pub mod config;
pub mod contracts;
pub mod error;
pub mod events;
pub mod express;
pub mod session;
pub mod wallet;

pub use blocks::{BlockService, BlockSubscription, DEFAULT_BLOCK_POLL, DEFAULT_RECENT_BLOCKS};
pub use chains::ChainListService;
pub use config::{Settings, SETTINGS_FILE};
pub use contracts::{ContractCall, ContractService};
pub use error::{Result, SessionError};
pub use events::{EventBus, SessionEvent};
pub use express::NeoExpressService;
pub use session::Session;
pub use wallet::{WalletBalances, WalletService, EXPRESS_WALLET_PASSWORD};
