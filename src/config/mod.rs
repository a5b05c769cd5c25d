use crate::autosave::DEFAULT_DEBOUNCE_MS;
use crate::media::DEFAULT_MAX_UPLOAD_BYTES;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_SIGNIN_URL: &str = "/auth/signin";
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Runtime settings injected by the hosting page as `window.ENV`.
///
/// Every key is optional. Keys are accepted in both `API_URL` and `api_url`
/// spellings; the upper-case one wins when both are present.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    /// Backend origin; empty means same origin as the page.
    pub api_url: String,
    pub signin_url: String,
    pub autosave_debounce_ms: u32,
    pub max_upload_bytes: u64,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            signin_url: DEFAULT_SIGNIN_URL.to_string(),
            autosave_debounce_ms: DEFAULT_DEBOUNCE_MS,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl AppConfig {
    /// Read `window.ENV`, falling back to defaults outside a browser or when unset.
    pub fn from_window() -> Self {
        let Some(window) = web_sys::window() else {
            return Self::default();
        };
        let Some(env) = window.get("ENV") else {
            return Self::default();
        };
        if env.is_undefined() || !env.is_object() {
            return Self::default();
        }

        js_sys::JSON::stringify(&env)
            .ok()
            .and_then(|s| s.as_string())
            .and_then(|s| serde_json::from_str::<Value>(&s).ok())
            .map(|v| Self::from_value(&v))
            .unwrap_or_default()
    }

    pub fn from_value(env: &Value) -> Self {
        let mut config = Self::default();

        if let Some(v) = lookup_str(env, "API_URL") {
            config.api_url = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = lookup_str(env, "SIGNIN_URL") {
            config.signin_url = v.to_string();
        }
        if let Some(v) = lookup_u64(env, "AUTOSAVE_DEBOUNCE_MS") {
            config.autosave_debounce_ms = u32::try_from(v).unwrap_or(u32::MAX);
        }
        if let Some(v) = lookup_u64(env, "MAX_UPLOAD_BYTES") {
            config.max_upload_bytes = v;
        }
        if let Some(v) = lookup_str(env, "LOG_LEVEL") {
            config.log_level = v.to_string();
        }

        config
    }
}

fn lookup<'a>(env: &'a Value, key: &str) -> Option<&'a Value> {
    env.get(key)
        .filter(|v| !v.is_null())
        .or_else(|| env.get(key.to_ascii_lowercase()).filter(|v| !v.is_null()))
}

fn lookup_str<'a>(env: &'a Value, key: &str) -> Option<&'a str> {
    lookup(env, key).and_then(Value::as_str)
}

/// Numbers may be injected as JSON numbers or numeric strings.
fn lookup_u64(env: &Value, key: &str) -> Option<u64> {
    let v = lookup(env, key)?;
    v.as_u64()
        .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
}
