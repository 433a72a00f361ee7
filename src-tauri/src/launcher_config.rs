use std::{env, time::Duration};

use url::Url;

use crate::{
    backend_readiness::ReadinessOptions, DEFAULT_READY_POLL_INTERVAL_MS,
    DEFAULT_READY_TIMEOUT_MS, READY_POLL_INTERVAL_ENV, READY_POLL_INTERVAL_MAX_MS,
    READY_POLL_INTERVAL_MIN_MS, READY_TIMEOUT_ENV, READY_TIMEOUT_MAX_MS, READY_TIMEOUT_MIN_MS,
    SERVER_LOOPBACK_HOST,
};

pub(crate) fn parse_clamped_millis(
    raw: Option<&str>,
    default_ms: u64,
    min_ms: u64,
    max_ms: u64,
) -> u64 {
    raw.map(str::trim)
        .filter(|value| !value.is_empty())
        .and_then(|value| value.parse::<u64>().ok())
        .map(|value| value.clamp(min_ms, max_ms))
        .unwrap_or(default_ms)
}

fn env_millis(env_key: &str, default_ms: u64, min_ms: u64, max_ms: u64) -> Duration {
    let raw = env::var(env_key).ok();
    Duration::from_millis(parse_clamped_millis(
        raw.as_deref(),
        default_ms,
        min_ms,
        max_ms,
    ))
}

pub(crate) fn resolve_readiness_options() -> ReadinessOptions {
    ReadinessOptions {
        timeout: env_millis(
            READY_TIMEOUT_ENV,
            DEFAULT_READY_TIMEOUT_MS,
            READY_TIMEOUT_MIN_MS,
            READY_TIMEOUT_MAX_MS,
        ),
        poll_interval: env_millis(
            READY_POLL_INTERVAL_ENV,
            DEFAULT_READY_POLL_INTERVAL_MS,
            READY_POLL_INTERVAL_MIN_MS,
            READY_POLL_INTERVAL_MAX_MS,
        ),
    }
}

/// Root URL of the embedded server on the loopback interface.
pub(crate) fn server_url(port: u16) -> Result<Url, String> {
    let raw = format!("https://{SERVER_LOOPBACK_HOST}:{port}/");
    Url::parse(&raw).map_err(|error| format!("Invalid server url {raw}: {error}"))
}
