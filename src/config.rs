use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use clap_serde_derive::ClapSerde;
use reqwest::Url;
use serde::Deserialize;

use crate::checker::{AccessibleStatusCodes, DEFAULT_REQUEST_TIMEOUT};
use crate::messaging::DEFAULT_TWILIO_API_BASE_URL;

pub const DEFAULT_CONFIG_FILE: &str = "TicketWatch.toml";
pub const DEFAULT_TARGET_URL: &str =
    "https://in.bookmyshow.com/sports/lucknow-super-giants-vs-mumbai-indians/ET00434749";
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(600);
pub const DEFAULT_FROM_NUMBER: &str = "whatsapp:+14155238886";

/// Longest interval or timeout accepted, one year.
pub const MAX_DURATION_SECS: u64 = 365 * 24 * 60 * 60;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the configuration file
    #[arg(short, long, env = "TICKET_WATCH_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    pub config_file: PathBuf,

    /// Configuration options
    #[command(flatten)]
    pub opt_config: <ConfigOptions as ClapSerde>::Opt,
}

/// How the scheduler waits between two cycles.
#[derive(ValueEnum, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CadenceKind {
    /// Sleep for the full interval after each cycle
    #[default]
    Sleep,
    /// Fire on a fixed-rate ticker
    Interval,
}

/// Unvalidated options as they come from the command line, the environment or the TOML file.
///
/// Empty strings stand for "not set".
#[derive(ClapSerde, Debug)]
pub struct ConfigOptions {
    /// The page whose accessibility is watched
    #[default(DEFAULT_TARGET_URL.to_string())]
    #[arg(long, env = "TARGET_URL")]
    pub target_url: String,

    /// Seconds to wait between two checks
    #[default(DEFAULT_CHECK_INTERVAL.as_secs())]
    #[arg(long, env = "CHECK_INTERVAL")]
    pub check_interval: u64,

    /// Waiting strategy between two checks
    #[arg(long, env = "CHECK_CADENCE", value_enum)]
    pub check_cadence: CadenceKind,

    /// Seconds before a check request is abandoned
    #[default(DEFAULT_REQUEST_TIMEOUT.as_secs())]
    #[arg(long, env = "REQUEST_TIMEOUT")]
    pub request_timeout: u64,

    /// HTTP status codes that mark the page as accessible
    #[default(vec![200, 201, 203, 204, 403])]
    #[arg(long, env = "ACCESSIBLE_STATUS_CODES", value_delimiter = ',')]
    pub accessible_status_codes: Vec<u16>,

    /// Append log lines to this file in addition to stdout
    #[arg(long, env = "LOG_FILE")]
    pub log_file: PathBuf,

    /// Twilio account SID
    #[arg(long, env = "TWILIO_ACCOUNT_SID")]
    pub twilio_account_sid: String,

    /// Twilio auth token
    #[arg(long, env = "TWILIO_AUTH_TOKEN", hide_env_values = true)]
    pub twilio_auth_token: String,

    /// Sender WhatsApp number
    #[default(DEFAULT_FROM_NUMBER.to_string())]
    #[arg(long, env = "TWILIO_WHATSAPP_NUMBER")]
    pub twilio_whatsapp_number: String,

    /// Recipient WhatsApp number
    #[arg(long, env = "RECIPIENT_WHATSAPP_NUMBER")]
    pub recipient_whatsapp_number: String,

    /// Root URL of the Twilio REST API
    #[default(DEFAULT_TWILIO_API_BASE_URL.to_string())]
    #[arg(long, env = "TWILIO_API_BASE_URL")]
    pub twilio_api_base_url: String,
}

impl ConfigOptions {
    pub fn from_toml(path: &Path) -> Result<<Self as ClapSerde>::Opt> {
        let str = std::fs::read_to_string(path)
            .with_context(|| format!("can't read config file {:?}", path))?;
        let options = toml::from_str(&str).context("invalid config format")?;
        Ok(options)
    }
}

/// Credentials and numbers used by the notifier. Any of them may be missing.
#[derive(Clone, PartialEq, Eq)]
pub struct MessagingConfig {
    pub account_sid: Option<String>,
    pub auth_token: Option<String>,
    pub from_number: String,
    pub recipient_number: Option<String>,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            account_sid: None,
            auth_token: None,
            from_number: DEFAULT_FROM_NUMBER.to_string(),
            recipient_number: None,
        }
    }
}

impl fmt::Debug for MessagingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessagingConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "***"))
            .field("from_number", &self.from_number)
            .field("recipient_number", &self.recipient_number)
            .finish()
    }
}

/// Validated configuration, built once at startup and handed to every component.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub target_url: Url,
    pub check_interval: Duration,
    pub cadence: CadenceKind,
    pub request_timeout: Duration,
    pub accessible_status_codes: AccessibleStatusCodes,
    pub log_file: Option<PathBuf>,
    pub messaging: MessagingConfig,
    pub messaging_api_base_url: Url,
}

impl Config {
    /// Reads the TOML file named in `args` and lays the command line and environment over it.
    ///
    /// # Errors
    ///
    /// Will return an error if an explicitly requested file can't be read or parsed, or if the
    /// merged options are invalid. A missing file at the default location is not an error.
    pub fn load(mut args: Args) -> Result<Self> {
        let options = if args.config_file.exists()
            || args.config_file != Path::new(DEFAULT_CONFIG_FILE)
        {
            ConfigOptions::from(ConfigOptions::from_toml(&args.config_file)?)
                .merge(&mut args.opt_config)
        } else {
            ConfigOptions::from(&mut args.opt_config)
        };

        Config::try_from(options)
    }
}

impl TryFrom<ConfigOptions> for Config {
    type Error = anyhow::Error;

    fn try_from(options: ConfigOptions) -> Result<Self, Self::Error> {
        let target_url = parse_http_url("target URL", &options.target_url)?;
        let check_interval = bounded_secs("check interval", options.check_interval)?;
        let request_timeout = bounded_secs("request timeout", options.request_timeout)?;
        let accessible_status_codes = AccessibleStatusCodes::new(options.accessible_status_codes)?;
        let messaging_api_base_url =
            parse_http_url("messaging API base URL", &options.twilio_api_base_url)?;

        Ok(Config {
            target_url,
            check_interval,
            cadence: options.check_cadence,
            request_timeout,
            accessible_status_codes,
            log_file: Some(options.log_file).filter(|path| !path.as_os_str().is_empty()),
            messaging: MessagingConfig {
                account_sid: non_empty(options.twilio_account_sid),
                auth_token: non_empty(options.twilio_auth_token),
                from_number: non_empty(options.twilio_whatsapp_number)
                    .unwrap_or_else(|| DEFAULT_FROM_NUMBER.to_string()),
                recipient_number: non_empty(options.recipient_whatsapp_number),
            },
            messaging_api_base_url,
        })
    }
}

fn non_empty(value: String) -> Option<String> {
    Some(value).filter(|value| !value.trim().is_empty())
}

fn parse_http_url(name: &str, value: &str) -> Result<Url> {
    let url = Url::parse(value).with_context(|| format!("invalid {}: {}", name, value))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("{} must use http or https: {}", name, value);
    }
    Ok(url)
}

fn bounded_secs(name: &str, secs: u64) -> Result<Duration> {
    match secs {
        0 => bail!("{} must be at least one second", name),
        secs if secs > MAX_DURATION_SECS => {
            bail!("{} must not exceed {} seconds", name, MAX_DURATION_SECS)
        }
        secs => Ok(Duration::from_secs(secs)),
    }
}
