//! Agent configuration from environment.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use dronegpt_chat::DEFAULT_API_URL;
use dronegpt_core::ImageDetail;

#[derive(Debug, Clone)]
pub struct Config {
    pub model: String,
    pub api_url: String,
    pub api_key: Option<String>,
    /// `None` leaves reply length to the provider.
    pub max_tokens: Option<u32>,
    pub loop_period: Duration,
    pub request_timeout: Duration,
    /// When set, take-off and landing outcomes are awaited up to this bound.
    pub action_timeout: Option<Duration>,
    pub image_detail: ImageDetail,
    pub jpeg_quality: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: "gpt-4-vision-preview".to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            api_key: None,
            max_tokens: Some(512),
            loop_period: Duration::from_millis(5000),
            request_timeout: Duration::from_secs(10),
            action_timeout: None,
            image_detail: ImageDetail::Auto,
            jpeg_quality: 100,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            model: env::var("DRONEGPT_MODEL").unwrap_or(defaults.model),
            api_url: env::var("DRONEGPT_API_URL").unwrap_or(defaults.api_url),
            api_key: env::var("OPENAI_API_KEY")
                .ok()
                .map(|key| key.trim().to_string())
                .filter(|key| !key.is_empty()),
            max_tokens: match parse_var::<u32>("DRONEGPT_MAX_TOKENS") {
                Some(0) => None,
                Some(tokens) => Some(tokens),
                None => defaults.max_tokens,
            },
            loop_period: parse_var("DRONEGPT_LOOP_PERIOD_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.loop_period),
            request_timeout: parse_var("DRONEGPT_REQUEST_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            action_timeout: parse_var("DRONEGPT_ACTION_TIMEOUT_MS").map(Duration::from_millis),
            image_detail: env::var("DRONEGPT_IMAGE_DETAIL")
                .ok()
                .and_then(|value| ImageDetail::parse(&value))
                .unwrap_or(defaults.image_detail),
            jpeg_quality: parse_var::<u8>("DRONEGPT_JPEG_QUALITY")
                .map(|quality| quality.clamp(1, 100))
                .unwrap_or(defaults.jpeg_quality),
        }
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.trim().parse().ok())
}
