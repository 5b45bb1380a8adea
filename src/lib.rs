//! Watches domain registrations over WHOIS and notifies when a domain is
//! about to expire or its registry status changes.

pub mod config;
pub mod diff;
pub mod domain;
pub mod error;
pub mod integration;
pub mod message;
pub mod metrics;
pub mod whois;
pub mod worker;

pub use config::Config;
pub use domain::Domain;
pub use error::Error;
pub use integration::{Integration, Integrations};
pub use metrics::{Gauges, Metrics};
pub use whois::{RegistrationRecord, RegistryClient, WhoisClient};
pub use worker::{Domains, watch};
