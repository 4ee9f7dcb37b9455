//! Slack notification channel
//!
//! Posts one message per batch through the `chat.postMessage` Web API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sizewatch_core::SizeChange;
use std::fmt;
use std::time::Duration;
use tracing::{info, instrument};

use crate::error::{ServiceError, ServiceResult};
use crate::notify::{describe_change, NotificationChannel};

/// Default Slack Web API base URL
pub const DEFAULT_SLACK_API_URL: &str = "https://slack.com/api";

/// Slack channel configuration
#[derive(Clone)]
pub struct SlackConfig {
    /// Web API base URL
    pub api_url: String,

    /// Bot token
    pub token: String,

    /// Channel ID or name to post to
    pub channel: String,

    /// Per-request timeout
    pub timeout: Duration,
}

impl SlackConfig {
    /// Create a configuration for the given token and channel
    pub fn new(token: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            api_url: DEFAULT_SLACK_API_URL.to_string(),
            token: token.into(),
            channel: channel.into(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Set the Web API base URL
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> ServiceResult<()> {
        if self.token.is_empty() {
            return Err(ServiceError::Configuration(
                "Slack token cannot be empty".to_string(),
            ));
        }
        if self.channel.is_empty() {
            return Err(ServiceError::Configuration(
                "Slack channel cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for SlackConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlackConfig")
            .field("api_url", &self.api_url)
            .field("token", &"***")
            .field("channel", &self.channel)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct PostMessage<'a> {
    channel: &'a str,
    text: String,
    unfurl_links: bool,
}

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Notification channel posting to Slack
#[derive(Debug, Clone)]
pub struct SlackNotifier {
    client: reqwest::Client,
    config: SlackConfig,
}

impl SlackNotifier {
    /// Create a new Slack notifier
    pub fn new(config: SlackConfig) -> ServiceResult<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ServiceError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl NotificationChannel for SlackNotifier {
    #[instrument(skip(self, changes), fields(channel = %self.config.channel, changes = changes.len()))]
    async fn report(&self, changes: &[SizeChange]) -> ServiceResult<()> {
        if changes.is_empty() {
            return Ok(());
        }

        let url = format!(
            "{}/chat.postMessage",
            self.config.api_url.trim_end_matches('/')
        );
        let body = PostMessage {
            channel: &self.config.channel,
            text: render_message(changes),
            unfurl_links: false,
        };

        let response: PostMessageResponse = self
            .client
            .post(&url)
            .bearer_auth(&self.config.token)
            .json(&body)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ServiceError::Notification(e.to_string()))?
            .json()
            .await
            .map_err(|e| ServiceError::Notification(e.to_string()))?;

        if !response.ok {
            return Err(ServiceError::Notification(
                response
                    .error
                    .unwrap_or_else(|| "unknown Slack error".to_string()),
            ));
        }

        info!("Posted size change report to Slack");
        Ok(())
    }
}

/// Message body listing every change of the batch
pub fn render_message(changes: &[SizeChange]) -> String {
    let mut text = format!(
        ":package: {} artifact size change{} detected\n",
        changes.len(),
        if changes.len() == 1 { "" } else { "s" }
    );
    for change in changes {
        text.push_str("• ");
        text.push_str(&describe_change(change));
        text.push('\n');
    }
    text
}
