#![allow(dead_code)]

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use ticket_watch::checker::{AccessibleStatusCodes, AvailabilityChecker};
use ticket_watch::config::MessagingConfig;
use ticket_watch::error::{ApiErrorResponse, MessagingError, MessagingResult};
use ticket_watch::messaging::{MessageRequest, MessagingApi};

/// Messaging API double that records every submitted body.
#[derive(Default)]
pub struct RecordingApi {
    pub bodies: Mutex<Vec<String>>,
    pub fail: bool,
}

impl RecordingApi {
    pub fn sent(&self) -> Vec<String> {
        self.bodies.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessagingApi for RecordingApi {
    async fn create_message(&self, request: &MessageRequest<'_>) -> MessagingResult<String> {
        self.bodies.lock().unwrap().push(request.body.to_string());
        if self.fail {
            return Err(MessagingError {
                status: Some(StatusCode::SERVICE_UNAVAILABLE),
                message: ApiErrorResponse::from("messaging API unavailable"),
            });
        }
        Ok(format!("SM{}", self.bodies.lock().unwrap().len()))
    }
}

pub fn messaging_config() -> MessagingConfig {
    MessagingConfig {
        account_sid: Some("AC123".into()),
        auth_token: Some("secret".into()),
        recipient_number: Some("whatsapp:+15550001111".into()),
        ..MessagingConfig::default()
    }
}

pub fn checker(timeout: Duration) -> AvailabilityChecker {
    AvailabilityChecker::new(timeout, AccessibleStatusCodes::default()).unwrap()
}

pub fn page_url(server_uri: &str) -> Url {
    Url::parse(&format!("{}/sports/event/ET00434749", server_uri)).unwrap()
}
