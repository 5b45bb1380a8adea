//! Notification backends and the fan-out over them.

mod discord;
mod telegram;

use async_trait::async_trait;
use log::{debug, error, info};
use tokio::select;
use tokio_util::sync::CancellationToken;

pub use discord::Discord;
pub use telegram::Telegram;

use crate::config::Config;
use crate::error::Error;

/// A messaging backend notifications can be delivered through.
#[async_trait]
pub trait Integration: Send + Sync {
    fn name(&self) -> &'static str;

    /// Prepares the backend from the configuration.
    ///
    /// Returns [`Error::NotConfigured`] when the backend has not been set up
    /// by the user, in which case it is left out.
    async fn setup(&mut self, config: &Config) -> Result<(), Error>;

    async fn send(&self, text: &str) -> Result<(), Error>;
}

/// Ordered set of ready-to-use integrations.
#[derive(Default)]
pub struct Integrations(Vec<Box<dyn Integration>>);

impl Integrations {
    #[must_use]
    pub fn new(integrations: Vec<Box<dyn Integration>>) -> Self {
        Self(integrations)
    }

    /// Sets up every known integration, keeping the configured ones.
    /// HTTP requests made by the integrations time out after
    /// `config.timeout()`.
    ///
    /// # Errors
    ///
    /// Returns the first setup error other than [`Error::NotConfigured`].
    pub async fn from_config(config: &Config) -> Result<Self, Error> {
        let candidates: Vec<Box<dyn Integration>> = vec![
            Box::new(Discord::new(config.timeout())?),
            Box::new(Telegram::new(config.timeout())?),
        ];

        let mut ready = Vec::with_capacity(candidates.len());
        for mut integration in candidates {
            match integration.setup(config).await {
                Ok(()) => {
                    info!("{} integration enabled", integration.name());
                    ready.push(integration);
                }
                Err(Error::NotConfigured(what)) => {
                    debug!("{} integration disabled: missing {what}", integration.name());
                }
                Err(e) => return Err(e),
            }
        }

        Ok(Self(ready))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Delivers `text` through every integration. Failures are logged per
    /// integration and never returned. A send still pending when `token` is
    /// cancelled is abandoned along with the remaining ones.
    pub async fn send(&self, token: &CancellationToken, text: &str) {
        for integration in &self.0 {
            select! {
                biased;
                () = token.cancelled() => {
                    debug!("Shutdown requested, dropping notification");
                    return;
                }
                result = integration.send(text) => {
                    if let Err(e) = result {
                        error!("Failed to send {} notification: {e}", integration.name());
                    }
                }
            }
        }
    }
}
