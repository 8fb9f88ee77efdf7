//! New-order announcements through the Telegram bot API.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::config::TelegramConfig;
use crate::models::order::Order;

/// Best-effort notification that a new order arrived. Never fails the caller.
#[async_trait]
pub trait Announcer: Send + Sync {
    async fn announce(&self, order: &Order, receipt_link: &str);
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: String,
    parse_mode: &'a str,
}

#[derive(Clone)]
pub struct TelegramAnnouncer {
    client: Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramAnnouncer {
    pub fn new(config: &TelegramConfig) -> Self {
        Self {
            client: Client::new(),
            api_base: config.api_base.clone(),
            bot_token: config.bot_token.clone(),
            chat_id: config.chat_id.clone(),
        }
    }

    fn send_message_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.bot_token)
    }

    async fn send(&self, text: String) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let body = SendMessageRequest {
            chat_id: &self.chat_id,
            text,
            parse_mode: "HTML",
        };

        let response = self
            .client
            .post(self.send_message_url())
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(format!("Telegram API error {}: {}", status, error_text).into());
        }

        Ok(())
    }
}

#[async_trait]
impl Announcer for TelegramAnnouncer {
    async fn announce(&self, order: &Order, receipt_link: &str) {
        match self.send(format_announcement(order, receipt_link)).await {
            Ok(()) => tracing::info!(order_id = %order.order_id, "Announced new order"),
            // reqwest errors embed the request URL, which carries the bot token
            Err(e) => tracing::warn!(
                order_id = %order.order_id,
                "Failed to announce new order: {}",
                e.to_string().replace(&self.bot_token, "***")
            ),
        }
    }
}

/// Telegram HTML message for a new order.
pub fn format_announcement(order: &Order, receipt_link: &str) -> String {
    format!(
        "🔔 <b>NEW ORDER</b>\n\n🆔 ID: {}\n📧 Email: {}\n📱 UDID: {}\n🖼️ <a href='{}'>View Receipt</a>",
        escape_html(&order.order_id),
        escape_html(&order.email),
        escape_html(&order.udid),
        escape_html(receipt_link),
    )
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '\'' => escaped.push_str("&#39;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
