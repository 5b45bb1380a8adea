//! Registry lookups over the WHOIS protocol.

mod client;
mod record;
mod servers;

use async_trait::async_trait;

pub use client::WhoisClient;
pub use record::RegistrationRecord;

use crate::error::Error;

/// Source of registration records, one domain at a time.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Looks up the current registration record for `domain`.
    async fn fetch(&self, domain: &str) -> Result<RegistrationRecord, Error>;
}
