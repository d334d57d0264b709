pub mod adapter;
mod cache;
mod client;
mod config;
mod diff;
mod error;
pub mod filter;
mod integration;
mod logger;
pub mod normalize;
pub mod protocol;
mod session;
mod types;

pub use adapter::{command_with_retry, CommandOutcome, PauseGuard};
pub use cache::{Observer, RefreshFailurePolicy, SpaCache};
pub use client::{SpaClient, SpaClientBuilder, DEFAULT_REQUEST_TIMEOUT, DEFAULT_SETTLE_DELAY};
pub use config::SpaConfig;
pub use error::{Error, ErrorKind, Result};
pub use integration::{DeviceInfo, Integration};
pub use logger::MessageLogMode;
pub use session::Session;
pub use types::*;
