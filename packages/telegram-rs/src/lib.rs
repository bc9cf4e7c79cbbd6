// Minimal Telegram Bot API client: just the calls the gatekeeper needs.

pub mod models;

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;

use crate::models::{ApiResponse, ChatMember, SentMessage};

/// Maximum length of a single text message accepted by the Bot API.
pub const MAX_MESSAGE_LENGTH: usize = 4096;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum TelegramError {
    /// The recipient blocked the bot or the bot lost access to the chat.
    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("telegram api error {code}: {description}")]
    Api { code: u16, description: String },

    #[error("request to telegram failed: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Clone)]
pub struct TelegramOptions {
    pub bot_token: String,
    pub api_base: String,
    /// Upper bound for a whole request, connect through body
    pub timeout: Duration,
}

impl TelegramOptions {
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            api_base: "https://api.telegram.org".to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TelegramService {
    options: TelegramOptions,
    client: Client,
}

impl TelegramService {
    pub fn new(options: TelegramOptions) -> Result<Self, TelegramError> {
        let client = Client::builder().timeout(options.timeout).build()?;

        Ok(Self { options, client })
    }

    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.options.api_base.trim_end_matches('/'),
            self.options.bot_token,
            method
        )
    }

    async fn call<B, T>(&self, method: &str, body: &B) -> Result<T, TelegramError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.method_url(method))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let envelope = response.json::<ApiResponse<T>>().await?;

        match (envelope.ok, envelope.result) {
            (true, Some(result)) => Ok(result),
            _ => {
                let code = envelope.error_code.unwrap_or(status.as_u16());
                let description = envelope
                    .description
                    .unwrap_or_else(|| "no description".to_string());
                tracing::debug!(method, code, %description, "telegram call rejected");
                if code == 403 {
                    Err(TelegramError::Forbidden(description))
                } else {
                    Err(TelegramError::Api { code, description })
                }
            }
        }
    }

    /// Send a text message, splitting it into several messages when it is
    /// longer than [`MAX_MESSAGE_LENGTH`]. Fails on the first rejected chunk.
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), TelegramError> {
        for chunk in split_text(text, MAX_MESSAGE_LENGTH) {
            let _: SentMessage = self
                .call("sendMessage", &json!({ "chat_id": chat_id, "text": chunk }))
                .await?;
        }
        Ok(())
    }

    pub async fn get_chat_member(
        &self,
        chat_id: i64,
        user_id: i64,
    ) -> Result<ChatMember, TelegramError> {
        self.call(
            "getChatMember",
            &json!({ "chat_id": chat_id, "user_id": user_id }),
        )
        .await
    }
}

/// Split `text` into chunks of at most `max_chars` characters.
///
/// A chunk ends at the last newline inside the window when there is one,
/// otherwise the window is cut hard. Leading whitespace of the remainder is
/// dropped.
pub fn split_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut parts = Vec::new();
    let mut rest = text;

    while rest.chars().count() > max_chars {
        let cut = rest
            .char_indices()
            .nth(max_chars)
            .map(|(idx, _)| idx)
            .unwrap_or(rest.len());
        let window = &rest[..cut];
        let end = match window.rfind('\n') {
            Some(idx) if idx > 0 => idx,
            _ => cut,
        };
        parts.push(window[..end].to_string());
        rest = rest[end..].trim_start();
    }

    if !rest.is_empty() || parts.is_empty() {
        parts.push(rest.to_string());
    }
    parts
}
