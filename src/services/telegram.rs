//! Telegram notifications for borrowing events

use async_trait::async_trait;

use crate::{
    config::TelegramConfig,
    error::{AppError, AppResult},
};

/// Outbound chat notifications
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `text`, failing when the remote side does not accept it
    async fn send_message(&self, text: &str) -> AppResult<()>;
}

/// Sends messages through the Telegram Bot API
#[derive(Clone)]
pub struct TelegramNotifier {
    client: reqwest::Client,
    api_url: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(config: &TelegramConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        // Missing credentials are not rejected here; Telegram refuses the request instead
        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            bot_token: config.bot_token.clone().unwrap_or_default(),
            chat_id: config.chat_id.clone().unwrap_or_default(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_url, self.bot_token)
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_message(&self, text: &str) -> AppResult<()> {
        let response = self
            .client
            .post(self.endpoint())
            .form(&[("chat_id", self.chat_id.as_str()), ("text", text)])
            .send()
            .await
            .map_err(|e| AppError::NotificationDeliveryFailed(e.to_string()))?;

        if response.status() != reqwest::StatusCode::OK {
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<unreadable body: {}>", e));
            return Err(AppError::NotificationDeliveryFailed(body));
        }

        tracing::debug!("Telegram message delivered");
        Ok(())
    }
}

/// Stand-in used when notifications are disabled
#[derive(Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_message(&self, text: &str) -> AppResult<()> {
        tracing::info!(text = %text, "Notification (telegram disabled)");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Form, http::StatusCode, routing::post, Router};
    use std::collections::HashMap;

    /// Fake Bot API accepting only chat "1001"
    async fn spawn_fake_telegram() -> String {
        async fn send_message(Form(form): Form<HashMap<String, String>>) -> (StatusCode, String) {
            match form.get("chat_id").map(String::as_str) {
                Some("1001") if form.contains_key("text") => {
                    (StatusCode::OK, r#"{"ok":true}"#.into())
                }
                _ => (
                    StatusCode::BAD_REQUEST,
                    r#"{"ok":false,"description":"Bad Request: chat not found"}"#.into(),
                ),
            }
        }

        let app = Router::new().route("/botTOKEN/sendMessage", post(send_message));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/", addr)
    }

    fn config(api_url: String, token: Option<&str>, chat_id: Option<&str>) -> TelegramConfig {
        TelegramConfig {
            enabled: Some(true),
            api_url,
            bot_token: token.map(String::from),
            chat_id: chat_id.map(String::from),
        }
    }

    #[test]
    fn test_endpoint() {
        let notifier = TelegramNotifier::new(&config(
            "https://api.telegram.org/".into(),
            Some("123:abc"),
            Some("1"),
        ))
        .unwrap();
        assert_eq!(
            notifier.endpoint(),
            "https://api.telegram.org/bot123:abc/sendMessage"
        );
    }

    #[tokio::test]
    async fn test_send_message_ok() {
        let url = spawn_fake_telegram().await;
        let notifier = TelegramNotifier::new(&config(url, Some("TOKEN"), Some("1001"))).unwrap();
        notifier.send_message("hello").await.unwrap();
    }

    #[tokio::test]
    async fn test_send_message_rejected() {
        let url = spawn_fake_telegram().await;
        let notifier = TelegramNotifier::new(&config(url, Some("TOKEN"), Some("42"))).unwrap();
        match notifier.send_message("hello").await {
            Err(AppError::NotificationDeliveryFailed(body)) => {
                assert!(body.contains("chat not found"))
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_send_message_without_token() {
        let url = spawn_fake_telegram().await;
        let notifier = TelegramNotifier::new(&config(url, None, None)).unwrap();
        assert!(matches!(
            notifier.send_message("hello").await,
            Err(AppError::NotificationDeliveryFailed(_))
        ));
    }

    #[test]
    fn test_log_notifier() {
        tokio_test::block_on(async {
            LogNotifier.send_message("hello").await.unwrap();
        });
    }
}
