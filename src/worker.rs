use chrono::Utc;
use log::{debug, error, info};
use std::{sync::Arc, time::Duration};
use tokio::{select, time::sleep};
use tokio_util::sync::CancellationToken;

use crate::domain::Domain;
use crate::error::Error;
use crate::integration::Integrations;
use crate::metrics::Metrics;
use crate::whois::RegistryClient;

/// The watched domains, checked one after the other.
pub struct Domains {
    sleep: Duration,
    domains: Vec<Domain>,
    registry: Arc<dyn RegistryClient>,
    metrics: Arc<dyn Metrics>,
}

impl Domains {
    /// `sleep` is the pause between two consecutive domain checks.
    #[must_use]
    pub fn new(
        sleep: Duration,
        registry: Arc<dyn RegistryClient>,
        metrics: Arc<dyn Metrics>,
    ) -> Self {
        Self {
            sleep,
            domains: Vec::new(),
            registry,
            metrics,
        }
    }

    pub fn add(&mut self, domain: Domain) {
        self.metrics.add_domain();
        self.domains.push(domain);
    }

    #[must_use]
    pub fn domains(&self) -> &[Domain] {
        &self.domains
    }

    /// Checks every domain once, in insertion order.
    ///
    /// Failures are logged and recorded per domain and never stop the tick.
    /// When `token` is cancelled the tick returns early and is not recorded
    /// as completed.
    pub async fn tick(&mut self, token: &CancellationToken, integrations: &Integrations) {
        for (i, domain) in self.domains.iter_mut().enumerate() {
            if token.is_cancelled() {
                info!("Shutdown requested, abandoning tick");
                return;
            }

            // Space out registry queries
            if i != 0 {
                select! {
                    biased;
                    () = token.cancelled() => {
                        info!("Shutdown requested during pacing delay");
                        return;
                    }
                    () = sleep(self.sleep) => {},
                }
            }

            match domain.run(self.registry.as_ref(), integrations, token).await {
                Ok(()) => self.metrics.set_update_success(&domain.name, true),
                Err(Error::Cancelled) => {
                    info!("domain={} Shutdown requested during fetch", domain.name);
                    return;
                }
                Err(e) => {
                    self.metrics.set_update_success(&domain.name, false);
                    error!("domain={} Domain update failed: {e}", domain.name);
                }
            }

            match domain.expires_at {
                Some(expires_at) => {
                    self.metrics.set_expiration(&domain.name, expires_at.timestamp());
                }
                None => self.metrics.clear_expiration(&domain.name),
            }
        }

        self.metrics.set_last_tick(Utc::now().timestamp());
        if let Some(snapshot) = self.metrics.snapshot() {
            debug!("Metrics after tick:\n{snapshot}");
        }
    }
}

/// Ticks every `every` until `token` is cancelled.
pub async fn watch(
    mut domains: Domains,
    integrations: Integrations,
    every: Duration,
    token: CancellationToken,
) {
    info!("Starting domain monitoring...");
    info!("Check interval: {} seconds", every.as_secs());
    info!("Delay between domains: {} seconds", domains.sleep.as_secs());
    if integrations.is_empty() {
        info!("No integration is configured, no notifications will be sent");
    } else {
        info!("Notifications go to {} integration(s)", integrations.len());
    }
    info!("Monitoring {} domains", domains.domains.len());

    loop {
        if token.is_cancelled() {
            info!("Shutdown requested, stopping monitor");
            break;
        }

        info!("Checking domains...");
        domains.tick(&token, &integrations).await;

        // Interruptible sleep
        select! {
            () = sleep(every) => {},
            () = token.cancelled() => {
                info!("Shutdown requested during sleep");
                break;
            }
        }
    }

    info!("Domain monitoring stopped gracefully");
}
