use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::Integration;
use crate::config::Config;
use crate::error::Error;

/// Discord webhook integration.
#[derive(Debug)]
pub struct Discord {
    client: Client,
    webhook_url: Option<String>,
    discord_id: Option<u64>,
}

#[derive(Serialize)]
struct DiscordMessage {
    content: String,
}

impl Discord {
    /// Creates an unconfigured integration whose requests give up after
    /// `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self, Error> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            webhook_url: None,
            discord_id: None,
        })
    }

    fn payload(&self, message: &str) -> DiscordMessage {
        // If discord_id is None, we don't want to mention anyone
        let tag = self.discord_id.map_or(String::new(), |id| format!("<@{id}> "));
        DiscordMessage {
            content: format!("{tag}{message}"),
        }
    }
}

#[async_trait]
impl Integration for Discord {
    fn name(&self) -> &'static str {
        "Discord"
    }

    async fn setup(&mut self, config: &Config) -> Result<(), Error> {
        let webhook_url = config
            .discord
            .webhook_url
            .clone()
            .ok_or(Error::NotConfigured("webhook URL"))?;
        self.webhook_url = Some(webhook_url);
        self.discord_id = config.discord.discord_id;
        Ok(())
    }

    async fn send(&self, text: &str) -> Result<(), Error> {
        let Some(webhook_url) = &self.webhook_url else {
            return Ok(());
        };

        let resp = self
            .client
            .post(webhook_url)
            .json(&self.payload(text))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(Error::UnexpectedStatus(resp.status()));
        }
        Ok(())
    }
}
