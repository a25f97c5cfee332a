use std::fmt::{Display, Formatter};

use reqwest::StatusCode;
use serde::Deserialize;

/// Failure reported by the outbound messaging API, or by the transport in front of it.
#[derive(Debug)]
pub struct MessagingError {
    pub status: Option<StatusCode>,
    pub message: ApiErrorResponse,
}

/// Error body returned by the Twilio REST API.
#[derive(Debug, Deserialize, PartialEq)]
pub struct ApiErrorResponse {
    #[serde(default)]
    pub code: Option<i64>,
    pub message: String,
}

impl From<String> for ApiErrorResponse {
    fn from(message: String) -> Self {
        ApiErrorResponse {
            code: None,
            message,
        }
    }
}

impl From<&str> for ApiErrorResponse {
    fn from(message: &str) -> Self {
        ApiErrorResponse {
            code: None,
            message: message.to_string(),
        }
    }
}

impl Display for MessagingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match (self.status, self.message.code) {
            (Some(status), Some(code)) => {
                write!(f, "{} (HTTP {}, code {})", self.message.message, status, code)
            }
            (Some(status), None) => write!(f, "{} (HTTP {})", self.message.message, status),
            _ => write!(f, "{}", self.message.message),
        }
    }
}

impl<E> From<E> for MessagingError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        MessagingError {
            status: None,
            message: ApiErrorResponse::from(format!("{:#}", err.into())),
        }
    }
}

pub type MessagingResult<T, E = MessagingError> = Result<T, E>;

#[macro_export]
macro_rules! bail_messaging {
    ($status:expr, $fmt:expr $(, $arg:expr)*) => {
        return Err($crate::error::MessagingError {
            status: Some($status),
            message: $crate::error::ApiErrorResponse::from(format!($fmt $(, $arg)*)),
        })
    };
}

#[macro_export]
macro_rules! exit_err {
    ($code:expr, $fmt:expr $(, $arg:expr)*) => {
        {
            tracing::error!($fmt $(, $arg)*);
            std::process::exit($code);
        }
    };
}
