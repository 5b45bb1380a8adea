use std::{collections::HashSet, time::Duration};

use async_trait::async_trait;
use log::{debug, warn};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    time::timeout,
};

use super::{
    RegistryClient,
    record::{RegistrationRecord, referral},
    servers::{IANA_SERVER, server_for, tld},
};
use crate::error::Error;

const WHOIS_PORT: u16 = 43;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_RESPONSE_SIZE: usize = 1024 * 1024;
const MAX_REFERRAL_DEPTH: u8 = 3;

/// Plain WHOIS client speaking to registry and registrar servers on port 43.
#[derive(Debug, Clone)]
pub struct WhoisClient {
    timeout: Duration,
}

impl Default for WhoisClient {
    fn default() -> Self {
        Self::new()
    }
}

impl WhoisClient {
    #[must_use]
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Queries the registry for `domain`, following registrar referrals.
    ///
    /// A failing referral does not fail the lookup: the record from the last
    /// server that answered is returned instead.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is invalid, no server is known for its
    /// TLD, or the registry server cannot be queried.
    pub async fn lookup(&self, domain: &str) -> Result<RegistrationRecord, Error> {
        let domain = normalize_domain(domain)?;
        let server = self.registry_server(&domain).await?;

        let raw = self.query_server(&server, &domain).await?;
        let mut record = RegistrationRecord::parse(&domain, &server, &raw);

        let mut visited = HashSet::from([server]);
        let mut next = referral(&raw);
        let mut depth = 1;

        while let Some(server) = next.take() {
            if depth >= MAX_REFERRAL_DEPTH {
                warn!("domain={domain} Max referral depth exceeded at {server}");
                break;
            }
            if !visited.insert(server.clone()) {
                debug!("domain={domain} Ignoring circular referral to {server}");
                break;
            }

            debug!("domain={domain} Following referral to {server}");
            let raw = match self.query_server(&server, &domain).await {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(
                        "domain={domain} Referral to {server} failed, keeping registry data: {e}"
                    );
                    break;
                }
            };

            let referred = RegistrationRecord::parse(&domain, &server, &raw);
            record = merge(record, referred);
            next = referral(&raw);
            depth += 1;
        }

        Ok(record)
    }

    async fn registry_server(&self, domain: &str) -> Result<String, Error> {
        let tld = tld(domain).ok_or_else(|| Error::InvalidDomain(domain.to_string()))?;
        if let Some(server) = server_for(tld) {
            return Ok(server.to_string());
        }

        debug!("domain={domain} Asking {IANA_SERVER} for the .{tld} server");
        let raw = self.query_server(IANA_SERVER, tld).await?;
        referral(&raw).ok_or_else(|| Error::Whois(format!("no WHOIS server known for .{tld}")))
    }

    async fn query_server(&self, server: &str, query: &str) -> Result<String, Error> {
        let addr = format!("{server}:{WHOIS_PORT}");

        let mut stream = timeout(self.timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| Error::Timeout(format!("Connection to {server} timed out")))?
            .map_err(|e| Error::Whois(format!("Failed to connect to {server}: {e}")))?;

        timeout(self.timeout, stream.write_all(format!("{query}\r\n").as_bytes()))
            .await
            .map_err(|_| Error::Timeout(format!("Write to {server} timed out")))?
            .map_err(|e| Error::Whois(format!("Failed to send query to {server}: {e}")))?;

        let mut response = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            match timeout(self.timeout, stream.read(&mut buf)).await {
                Ok(Ok(0)) => break,
                Ok(Ok(n)) => {
                    response.extend_from_slice(&buf[..n]);
                    if response.len() > MAX_RESPONSE_SIZE {
                        return Err(Error::Whois(format!("Response from {server} too large")));
                    }
                }
                // Keep whatever arrived before the connection stalled or broke
                Ok(Err(e)) if !response.is_empty() => {
                    warn!("Read from {server} failed, using partial response: {e}");
                    break;
                }
                Err(_) if !response.is_empty() => break,
                Ok(Err(e)) => return Err(Error::Whois(format!("Read from {server} failed: {e}"))),
                Err(_) => return Err(Error::Timeout(format!("Read from {server} timed out"))),
            }
        }

        Ok(decode(response))
    }
}

#[async_trait]
impl RegistryClient for WhoisClient {
    async fn fetch(&self, domain: &str) -> Result<RegistrationRecord, Error> {
        self.lookup(domain).await
    }
}

/// Prefers the registrar's answer, falling back to the registry's fields.
fn merge(registry: RegistrationRecord, registrar: RegistrationRecord) -> RegistrationRecord {
    RegistrationRecord {
        domain: registrar.domain,
        registrar: registrar.registrar.or(registry.registrar),
        expiration_date: registrar.expiration_date.or(registry.expiration_date),
        status: if registrar.status.is_empty() {
            registry.status
        } else {
            registrar.status
        },
        nameservers: if registrar.nameservers.is_empty() {
            registry.nameservers
        } else {
            registrar.nameservers
        },
        whois_server: registrar.whois_server,
    }
}

fn decode(bytes: Vec<u8>) -> String {
    // Latin-1 fallback for registries that do not answer in UTF-8
    String::from_utf8(bytes)
        .unwrap_or_else(|e| e.into_bytes().iter().map(|&c| char::from(c)).collect())
}

fn normalize_domain(domain: &str) -> Result<String, Error> {
    let domain = domain.trim().trim_end_matches('.').to_lowercase();

    let domain = domain
        .strip_prefix("http://")
        .or_else(|| domain.strip_prefix("https://"))
        .unwrap_or(&domain);
    let domain = domain.split('/').next().unwrap_or(domain);
    let domain = domain.strip_prefix("www.").unwrap_or(domain);

    if domain.is_empty() || !domain.contains('.') {
        return Err(Error::InvalidDomain(domain.to_string()));
    }
    if !domain
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        return Err(Error::InvalidDomain(domain.to_string()));
    }

    Ok(domain.to_string())
}
