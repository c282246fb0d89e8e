// src/lib.rs
pub mod aggregate;
pub mod bruteforce;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod output;
pub mod resolver;
pub mod session;
pub mod shutdown;
pub mod sources;
pub mod types;
pub mod utils;
pub mod wildcard;
pub mod wordlist;

pub use cli::Args;
pub use engine::ScanEngine;
pub use types::{Domain, ScanConfig, ScanMode, ScanReport, SubdomainResult, SubdomainSet, SubscoutError};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
