//! Configuration module.
//!
//! Loading and validation of the bridge configuration: the ordered
//! method list, the uniform per-method timeout, and per-method
//! endpoint/credential-source settings. The password fallback is not part
//! of the configurable order; it is appended structurally by
//! [`SelectorConfig::candidate_order`].

mod loader;
mod types;

pub use loader::{apply_env_overrides, load_config, load_config_from_str};
pub use types::{
    Config, DirectoryConfig, LoggingConfig, SecretStoreConfig, SelectorConfig, TicketConfig,
    TokenConfig,
};
