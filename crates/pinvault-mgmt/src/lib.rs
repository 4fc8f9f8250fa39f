#![warn(missing_docs)]

//! PinVault management: file service facade, configuration and CLI

pub mod cli;
pub mod config;
pub mod service;

pub use config::VaultConfig;
pub use service::{Disposition, FileService, IngestRequest, ServedFile, ServiceError};
