use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::bail_messaging;
use crate::error::{ApiErrorResponse, MessagingError, MessagingResult};

pub const DEFAULT_TWILIO_API_BASE_URL: &str = "https://api.twilio.com";

const TWILIO_API_VERSION: &str = "2010-04-01";
const TWILIO_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Everything the messaging API needs to deliver one text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRequest<'a> {
    pub account_sid: &'a str,
    pub auth_token: &'a str,
    pub from: &'a str,
    pub to: &'a str,
    pub body: &'a str,
}

/// Outbound messaging service. Returns the identifier the service assigned to the message.
#[async_trait]
pub trait MessagingApi: Send + Sync {
    async fn create_message(&self, request: &MessageRequest<'_>) -> MessagingResult<String>;
}

#[derive(Deserialize)]
struct CreatedMessage {
    sid: String,
}

/// Client for the Twilio Programmable Messaging REST API.
#[derive(Clone, Debug)]
pub struct TwilioApi {
    client: Client,
    base_url: Url,
}

impl TwilioApi {
    pub fn new(base_url: Url) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(TWILIO_REQUEST_TIMEOUT).build()?;
        Ok(Self { client, base_url })
    }

    fn messages_url(&self, account_sid: &str) -> MessagingResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("Messaging API base URL {} cannot be a base", self.base_url))?
            .pop_if_empty()
            .extend([TWILIO_API_VERSION, "Accounts", account_sid, "Messages.json"]);
        Ok(url)
    }
}

#[async_trait]
impl MessagingApi for TwilioApi {
    #[tracing::instrument(level = "debug", skip_all, fields(to = request.to))]
    async fn create_message(&self, request: &MessageRequest<'_>) -> MessagingResult<String> {
        let response = self
            .client
            .post(self.messages_url(request.account_sid)?)
            .basic_auth(request.account_sid, Some(request.auth_token))
            .form(&[
                ("To", request.to),
                ("From", request.from),
                ("Body", request.body),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorResponse>(&body)
                .unwrap_or_else(|_| ApiErrorResponse::from(body));
            return Err(MessagingError {
                status: Some(status),
                message,
            });
        }

        let created: CreatedMessage = response.json().await?;
        if created.sid.is_empty() {
            bail_messaging!(status, "Messaging API returned an empty message SID");
        }
        Ok(created.sid)
    }
}
