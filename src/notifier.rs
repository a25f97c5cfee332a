use reqwest::Url;
use tracing::{error, info};

use crate::config::MessagingConfig;
use crate::messaging::{MessageRequest, MessagingApi};

/// Sends a WhatsApp message announcing that the watched page became accessible.
pub struct Notifier<A> {
    api: A,
    config: MessagingConfig,
}

impl<A: MessagingApi> Notifier<A> {
    pub fn new(api: A, config: MessagingConfig) -> Self {
        Self { api, config }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Best effort: missing credentials and API failures are logged, never returned.
    pub async fn notify(&self, url: &Url) {
        let (Some(account_sid), Some(auth_token), Some(recipient)) = (
            present(&self.config.account_sid),
            present(&self.config.auth_token),
            present(&self.config.recipient_number),
        ) else {
            error!("Missing Twilio credentials.");
            return;
        };

        let body = message_body(url);
        let request = MessageRequest {
            account_sid,
            auth_token,
            from: &self.config.from_number,
            to: recipient,
            body: &body,
        };

        match self.api.create_message(&request).await {
            Ok(sid) => info!(%sid, "WhatsApp message sent."),
            Err(err) => error!(error = %err, "Failed to send WhatsApp message"),
        }
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.trim().is_empty())
}

pub fn message_body(url: &Url) -> String {
    format!("🎉 Ticket Available! Quick, book now at: {}", url)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use reqwest::StatusCode;

    use super::*;
    use crate::error::{ApiErrorResponse, MessagingError, MessagingResult};

    #[derive(Default)]
    struct RecordingApi {
        sent: Mutex<Vec<(String, String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl MessagingApi for RecordingApi {
        async fn create_message(&self, request: &MessageRequest<'_>) -> MessagingResult<String> {
            self.sent.lock().unwrap().push((
                request.from.to_string(),
                request.to.to_string(),
                request.body.to_string(),
            ));
            if self.fail {
                return Err(MessagingError {
                    status: Some(StatusCode::BAD_REQUEST),
                    message: ApiErrorResponse::from("invalid To number"),
                });
            }
            Ok("SM1".into())
        }
    }

    fn full_config() -> MessagingConfig {
        MessagingConfig {
            account_sid: Some("AC123".into()),
            auth_token: Some("secret".into()),
            recipient_number: Some("whatsapp:+15550001111".into()),
            ..MessagingConfig::default()
        }
    }

    fn url() -> Url {
        Url::parse("https://tickets.example.com/event/42").unwrap()
    }

    #[tokio::test]
    async fn it_should_send_exactly_one_message_containing_the_url() {
        let notifier = Notifier::new(RecordingApi::default(), full_config());

        notifier.notify(&url()).await;

        let sent = notifier.api().sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let (from, to, body) = &sent[0];
        assert_eq!(from, "whatsapp:+14155238886");
        assert_eq!(to, "whatsapp:+15550001111");
        assert!(body.contains("https://tickets.example.com/event/42"));
    }

    #[tokio::test]
    async fn it_should_not_call_the_api_when_a_credential_is_missing() {
        let missing: [fn(&mut MessagingConfig); 3] = [
            |c| c.account_sid = None,
            |c| c.auth_token = None,
            |c| c.recipient_number = Some("  ".into()),
        ];

        for strip in missing {
            let mut config = full_config();
            strip(&mut config);
            let notifier = Notifier::new(RecordingApi::default(), config);

            notifier.notify(&url()).await;

            assert!(notifier.api().sent.lock().unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn it_should_swallow_submission_failures() {
        let api = RecordingApi {
            fail: true,
            ..RecordingApi::default()
        };
        let notifier = Notifier::new(api, full_config());

        notifier.notify(&url()).await;

        assert_eq!(notifier.api().sent.lock().unwrap().len(), 1);
    }

    #[test]
    fn message_body_should_announce_the_url() {
        assert_eq!(
            message_body(&url()),
            "🎉 Ticket Available! Quick, book now at: https://tickets.example.com/event/42"
        );
    }
}
