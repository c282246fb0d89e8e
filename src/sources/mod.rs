// src/sources/mod.rs
use crate::session::Session;
use crate::types::{Domain, PassiveConfig, SubdomainSet, SubscoutError};
use async_trait::async_trait;

mod certsh;

pub use certsh::CrtShSource;

/// A passive subdomain source queried over HTTP.
#[async_trait]
pub trait Source: Send + Sync {
    fn name(&self) -> &str;
    async fn enumerate(&self, domain: &Domain, session: &Session) -> Result<SubdomainSet, SubscoutError>;
}

pub fn create_source(name: &str, config: &PassiveConfig) -> Option<Box<dyn Source>> {
    match name.to_lowercase().as_str() {
        "crtsh" => Some(Box::new(CrtShSource::new(&config.endpoint))),
        _ => None,
    }
}
