//! Logging and tracing configuration.
//!
//! Structured JSON output in production, human-readable output in
//! development, with environment-based level configuration and redaction
//! helpers for payment credentials and codes.

use std::env;

use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Environment {
    pub fn from_env() -> Self {
        match env::var("ENVIRONMENT")
            .or_else(|_| env::var("ENV"))
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
            .as_str()
        {
            "prod" | "production" => Self::Production,
            "staging" | "stage" => Self::Staging,
            _ => Self::Development,
        }
    }

    pub fn default_log_level(&self) -> Level {
        match self {
            Self::Development => Level::DEBUG,
            Self::Staging | Self::Production => Level::INFO,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Initialize the tracing subscriber.
///
/// # Environment Variables
/// - `ENVIRONMENT` or `ENV`: "production", "staging", or "development"
/// - `RUST_LOG`: override log filter
/// - `LOG_FORMAT`: force "json" or "pretty"
pub fn init_tracing() {
    let environment = Environment::from_env();

    let use_json = env::var("LOG_FORMAT")
        .map(|f| f.to_lowercase() == "json")
        .unwrap_or_else(|_| environment.is_production());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            EnvFilter::try_new(format!(
                "chempay_backend={},tower_http=debug,axum=debug,hyper=warn,reqwest=warn",
                environment.default_log_level()
            ))
        })
        .unwrap();

    if use_json {
        let json_layer = fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .with_level(true)
            .with_filter(env_filter);

        tracing_subscriber::registry().with(json_layer).init();
    } else {
        let pretty_layer = fmt::layer()
            .pretty()
            .with_target(true)
            .with_level(true)
            .with_file(true)
            .with_line_number(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(env_filter);

        tracing_subscriber::registry().with(pretty_layer).init();
    }

    tracing::info!(
        environment = ?environment,
        format = if use_json { "json" } else { "pretty" },
        "tracing initialized"
    );
}

/// Mask a readable payment code for logging: first and last character
/// visible, the rest starred.
pub fn mask_payment_code(code: &str) -> String {
    if code.len() <= 2 {
        return "****".to_string();
    }
    let first = &code[..1];
    let last = &code[code.len() - 1..];
    format!("{}{}{}", first, "*".repeat(code.len() - 2), last)
}

/// Redact gateway credentials and account details from JSON-like text
/// before it reaches the logs.
pub fn redact_sensitive_data(text: &str) -> String {
    let sensitive_keys = [
        "apiKey",
        "api_key",
        "secretKey",
        "secret_key",
        "accountNumber",
        "account_number",
        "iban",
        "password",
        "token",
        "authorization",
    ];

    let mut result = text.to_string();
    for key in &sensitive_keys {
        let pattern = format!(r#""{}":\s*"[^"]*""#, key);
        if let Ok(re) = regex::Regex::new(&pattern) {
            result = re
                .replace_all(&result, format!(r#""{}": "[REDACTED]""#, key))
                .to_string();
        }
    }
    result
}
