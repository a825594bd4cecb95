use std::{path::PathBuf, str::FromStr, time::Duration};

use log::warn;

use crate::dispatch::FallbackPolicy;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_key: Option<String>,
    pub gemini_base_url: String,
    pub gemini_model: String,
    pub classifier_timeout: Duration,
    pub location_timeout: Duration,
    /// Real time between ticks of the simulated clock.
    pub tick_interval: Duration,
    /// Simulated seconds added per tick; values above 1 fast-forward the demo.
    pub seconds_per_tick: u64,
    pub contact_notify_secs: u64,
    /// Log a heartbeat every this many ticks.
    pub heartbeat_every_ticks: u32,
    pub fallback: FallbackPolicy,
    pub profile_path: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.into(),
            gemini_model: DEFAULT_GEMINI_MODEL.into(),
            classifier_timeout: Duration::from_secs(20),
            location_timeout: Duration::from_secs(5),
            tick_interval: Duration::from_secs(1),
            seconds_per_tick: 5,
            contact_notify_secs: 15,
            heartbeat_every_ticks: 10,
            fallback: FallbackPolicy::Surface,
            profile_path: PathBuf::from("resq-profile.json"),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup; unparsable values keep the default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        config.api_key = get("GEMINI_API_KEY").or_else(|| get("API_KEY"));
        if let Some(url) = get("RESQ_GEMINI_BASE_URL") {
            config.gemini_base_url = url;
        }
        if let Some(model) = get("RESQ_GEMINI_MODEL") {
            config.gemini_model = model;
        }
        if let Some(secs) = parse_var::<u64>(&get, "RESQ_CLASSIFIER_TIMEOUT_SECS") {
            config.classifier_timeout = Duration::from_secs(secs.max(1));
        }
        if let Some(secs) = parse_var::<u64>(&get, "RESQ_LOCATION_TIMEOUT_SECS") {
            config.location_timeout = Duration::from_secs(secs.max(1));
        }
        if let Some(ms) = parse_var::<u64>(&get, "RESQ_TICK_MS") {
            config.tick_interval = Duration::from_millis(ms.max(10));
        }
        if let Some(secs) = parse_var::<u64>(&get, "RESQ_SECONDS_PER_TICK") {
            config.seconds_per_tick = secs.max(1);
        }
        if let Some(secs) = parse_var::<u64>(&get, "RESQ_CONTACT_NOTIFY_SECS") {
            config.contact_notify_secs = secs;
        }
        if let Some(policy) = parse_var::<FallbackPolicy>(&get, "RESQ_FALLBACK") {
            config.fallback = policy;
        }
        if let Some(path) = get("RESQ_PROFILE_PATH") {
            config.profile_path = PathBuf::from(path);
        }

        let debug_mode = get("RESQ_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        config.heartbeat_every_ticks = if debug_mode { 1 } else { 10 };

        config
    }
}

fn parse_var<T: FromStr>(get: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = get(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring {key}={raw:?}: not a valid value");
            None
        }
    }
}
