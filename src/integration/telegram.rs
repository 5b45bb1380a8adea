use std::time::Duration;

use async_trait::async_trait;
use log::info;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::Integration;
use crate::config::Config;
use crate::error::Error;

const API_URL: &str = "https://api.telegram.org";

/// Telegram Bot API integration.
#[derive(Debug)]
pub struct Telegram {
    client: Client,
    token: Option<String>,
    chat_id: i64,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
    parse_mode: &'static str,
}

#[derive(Deserialize)]
struct GetMe {
    result: BotUser,
}

#[derive(Deserialize)]
struct BotUser {
    username: Option<String>,
}

impl Telegram {
    /// Creates an unconfigured integration whose requests give up after
    /// `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self, Error> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            token: None,
            chat_id: 0,
        })
    }

    fn method_url(token: &str, method: &str) -> String {
        format!("{API_URL}/bot{token}/{method}")
    }

    /// Verifies the bot token against the Bot API.
    async fn login(&mut self, token: String) -> Result<(), Error> {
        let resp = self
            .client
            .get(Self::method_url(&token, "getMe"))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(Error::UnexpectedStatus(resp.status()));
        }

        let me: GetMe = resp.json().await?;
        info!(
            "Connected to Telegram as {}",
            me.result.username.as_deref().unwrap_or("<unnamed bot>")
        );
        self.token = Some(token);
        Ok(())
    }
}

#[async_trait]
impl Integration for Telegram {
    fn name(&self) -> &'static str {
        "Telegram"
    }

    async fn setup(&mut self, config: &Config) -> Result<(), Error> {
        self.chat_id = match config.telegram.chat_id {
            Some(0) | None => return Err(Error::NotConfigured("chat ID")),
            Some(chat_id) => chat_id,
        };
        let token = config
            .telegram
            .token
            .clone()
            .filter(|token| !token.is_empty())
            .ok_or(Error::NotConfigured("token"))?;

        self.login(token).await
    }

    async fn send(&self, text: &str) -> Result<(), Error> {
        let Some(token) = &self.token else {
            return Ok(());
        };

        let resp = self
            .client
            .post(Self::method_url(token, "sendMessage"))
            .json(&SendMessage {
                chat_id: self.chat_id,
                text,
                parse_mode: "Markdown",
            })
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(Error::UnexpectedStatus(resp.status()));
        }
        Ok(())
    }
}
