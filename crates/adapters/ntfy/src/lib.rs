//! # hvac-adapter-ntfy
//!
//! Push notifications through [ntfy](https://ntfy.sh).
//!
//! [`NtfyNotifier`] publishes to a topic over HTTPS; [`LogNotifier`] stands
//! in when no topic is configured and only writes the alert to the log.
//!
//! ## Dependency rule
//!
//! Depends on `hvac-app` (port traits) and `hvac-domain` only.

mod error;

use std::future::Future;
use std::time::Duration;

use serde::Serialize;

use hvac_app::ports::Notifier;
use hvac_domain::error::HvacError;

pub use error::NotifyError;

/// Public ntfy instance.
pub const DEFAULT_BASE_URL: &str = "https://ntfy.sh";

#[derive(Debug, Serialize)]
struct Publish<'a> {
    topic: &'a str,
    title: &'a str,
    message: &'a str,
}

/// Publishes notifications to one ntfy topic.
#[derive(Debug, Clone)]
pub struct NtfyNotifier {
    http: reqwest::Client,
    base_url: String,
    topic: String,
}

impl NtfyNotifier {
    /// # Errors
    ///
    /// Returns [`NotifyError::Http`] when the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, topic: impl Into<String>) -> Result<Self, NotifyError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        let topic = topic.into();
        tracing::info!(%topic, "ntfy notifications enabled");
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            topic,
        })
    }

    async fn publish(&self, title: &str, message: &str) -> Result<(), NotifyError> {
        let body = Publish {
            topic: &self.topic,
            title,
            message,
        };
        let response = self
            .http
            .post(&self.base_url)
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status(status.as_u16()));
        }
        tracing::debug!(title, status = status.as_u16(), "notification sent");
        Ok(())
    }
}

impl Notifier for NtfyNotifier {
    fn send(&self, title: &str, message: &str) -> impl Future<Output = Result<(), HvacError>> + Send {
        async move { Ok(self.publish(title, message).await?) }
    }
}

/// Writes alerts to the log instead of sending them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, title: &str, message: &str) -> impl Future<Output = Result<(), HvacError>> + Send {
        tracing::warn!(title, message, "notification (no ntfy topic configured)");
        async { Ok(()) }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::Router;
    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::post;
    use serde_json::Value;

    use super::*;

    type Received = Arc<Mutex<Vec<Value>>>;

    async fn serve(status: StatusCode) -> (String, Received) {
        let received: Received = Arc::default();
        let app = Router::new()
            .route(
                "/",
                post(
                    move |State(received): State<Received>, body: axum::Json<Value>| async move {
                        received.lock().unwrap().push(body.0);
                        status
                    },
                ),
            )
            .with_state(Arc::clone(&received));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        (format!("http://{addr}/"), received)
    }

    #[tokio::test]
    async fn should_publish_title_and_message_to_topic() {
        let (url, received) = serve(StatusCode::OK).await;
        let notifier = NtfyNotifier::new(url, "hvac-alerts").unwrap();

        notifier
            .send("HVAC Sensor Failure", "[Basement Zone Disabled] Basement: 12.0°F")
            .await
            .unwrap();

        let received = received.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0]["topic"], "hvac-alerts");
        assert_eq!(received[0]["title"], "HVAC Sensor Failure");
    }

    #[tokio::test]
    async fn should_fail_on_error_status() {
        let (url, _) = serve(StatusCode::TOO_MANY_REQUESTS).await;
        let notifier = NtfyNotifier::new(url, "hvac-alerts").unwrap();

        let result = notifier.send("title", "message").await;

        assert!(matches!(result, Err(HvacError::Hardware(_))));
    }

    #[tokio::test]
    async fn should_always_succeed_when_only_logging() {
        assert!(LogNotifier.send("title", "message").await.is_ok());
    }
}
