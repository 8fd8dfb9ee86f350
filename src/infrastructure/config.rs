use crate::infrastructure::error::InfraError;
use crate::infrastructure::google_calendar_client::DEFAULT_CALENDAR_API_BASE;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const APP_JSON: &str = "app.json";
const SCHEMA_VERSION: u64 = 1;
pub const MAX_LOOKBACK_DAYS: i64 = 3650;

pub const DEFAULT_SCOPES: [&str; 4] = [
    "openid",
    "email",
    "profile",
    "https://www.googleapis.com/auth/calendar.readonly",
];
const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:3000/auth/callback";
const DEFAULT_TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const DEFAULT_AUTHORIZATION_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub token_endpoint: String,
    pub authorization_endpoint: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `None` when no client id/secret is configured; login is then disabled.
    pub oauth: Option<GoogleOAuthConfig>,
    pub calendar_id: String,
    pub calendar_api_base: String,
    pub timezone: Tz,
    pub lookback_days: i64,
    pub max_results: u32,
    pub relay_max_results: u32,
    pub host: String,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            oauth: None,
            calendar_id: "primary".to_string(),
            calendar_api_base: DEFAULT_CALENDAR_API_BASE.to_string(),
            timezone: chrono_tz::Asia::Tokyo,
            lookback_days: 7,
            max_results: 100,
            relay_max_results: 10,
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

/// On-disk shape of `config/app.json`. Every field is optional; the
/// environment wins over the file.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    pub schema: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calendar_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calendar_api_base: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lookback_days: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_results: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relay_max_results: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scopes: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

fn default_file() -> serde_json::Value {
    serde_json::json!({
        "schema": SCHEMA_VERSION,
        "timezone": "Asia/Tokyo",
        "calendarId": "primary",
        "lookbackDays": 7,
        "maxResults": 100,
        "relayMaxResults": 10
    })
}

pub fn ensure_default_config(config_dir: &Path) -> Result<(), InfraError> {
    fs::create_dir_all(config_dir)?;
    let path = config_dir.join(APP_JSON);
    if !path.exists() {
        let formatted = serde_json::to_string_pretty(&default_file())?;
        fs::write(path, format!("{formatted}\n"))?;
    }
    Ok(())
}

pub fn read_config_file(path: &Path) -> Result<ConfigFile, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != SCHEMA_VERSION {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(serde_json::from_value(parsed)?)
}

/// Loads `config_dir/app.json` if present, then applies process env.
pub fn load_app_config(config_dir: Option<&Path>) -> Result<AppConfig, InfraError> {
    let file = match config_dir.map(|dir| dir.join(APP_JSON)) {
        Some(path) if path.exists() => read_config_file(&path)?,
        _ => ConfigFile::default(),
    };
    build_config(file, |key| std::env::var(key).ok())
}

pub fn build_config<F>(file: ConfigFile, lookup: F) -> Result<AppConfig, InfraError>
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = AppConfig::default();

    let timezone = match optional_lookup_value(&lookup, &["AKITIME_TIMEZONE"]).or(file.timezone) {
        Some(name) => parse_timezone(&name)?,
        None => defaults.timezone,
    };
    let lookback_days = match optional_lookup_value(&lookup, &["AKITIME_LOOKBACK_DAYS"]) {
        Some(raw) => parse_number(&raw, "AKITIME_LOOKBACK_DAYS")?,
        None => file.lookback_days.unwrap_or(defaults.lookback_days),
    };
    if !(0..=MAX_LOOKBACK_DAYS).contains(&lookback_days) {
        return Err(InfraError::InvalidConfig(format!(
            "lookback days must be between 0 and {MAX_LOOKBACK_DAYS}, got {lookback_days}"
        )));
    }
    let max_results = match optional_lookup_value(&lookup, &["AKITIME_MAX_RESULTS"]) {
        Some(raw) => parse_number(&raw, "AKITIME_MAX_RESULTS")?,
        None => file.max_results.unwrap_or(defaults.max_results),
    };
    let relay_max_results = match optional_lookup_value(&lookup, &["AKITIME_RELAY_MAX_RESULTS"]) {
        Some(raw) => parse_number(&raw, "AKITIME_RELAY_MAX_RESULTS")?,
        None => file.relay_max_results.unwrap_or(defaults.relay_max_results),
    };
    if max_results == 0 || relay_max_results == 0 {
        return Err(InfraError::InvalidConfig(
            "result caps must be greater than zero".to_string(),
        ));
    }
    let port = match optional_lookup_value(&lookup, &["AKITIME_PORT"]) {
        Some(raw) => parse_number(&raw, "AKITIME_PORT")?,
        None => file.port.unwrap_or(defaults.port),
    };

    let redirect_uri = optional_lookup_value(&lookup, &["AKITIME_GOOGLE_REDIRECT_URI", "GOOGLE_REDIRECT_URI"])
        .or(file.redirect_uri)
        .unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string());
    let scopes = optional_lookup_value(&lookup, &["AKITIME_GOOGLE_SCOPES", "GOOGLE_SCOPES"])
        .map(|raw| parse_scope_list(&raw))
        .or(file.scopes)
        .filter(|scopes| !scopes.is_empty())
        .unwrap_or_else(|| DEFAULT_SCOPES.iter().map(|scope| scope.to_string()).collect());

    let client_id = optional_lookup_value(&lookup, &["AKITIME_GOOGLE_CLIENT_ID", "GOOGLE_CLIENT_ID"]);
    let client_secret =
        optional_lookup_value(&lookup, &["AKITIME_GOOGLE_CLIENT_SECRET", "GOOGLE_CLIENT_SECRET"]);
    let oauth = match (client_id, client_secret) {
        (Some(client_id), Some(client_secret)) => Some(GoogleOAuthConfig {
            client_id,
            client_secret,
            redirect_uri,
            scopes,
            token_endpoint: optional_lookup_value(&lookup, &["AKITIME_GOOGLE_TOKEN_ENDPOINT"])
                .unwrap_or_else(|| DEFAULT_TOKEN_ENDPOINT.to_string()),
            authorization_endpoint: optional_lookup_value(
                &lookup,
                &["AKITIME_GOOGLE_AUTHORIZATION_ENDPOINT"],
            )
            .unwrap_or_else(|| DEFAULT_AUTHORIZATION_ENDPOINT.to_string()),
        }),
        (None, None) => None,
        (Some(_), None) => {
            return Err(InfraError::InvalidConfig(
                "missing google client secret (set one of: AKITIME_GOOGLE_CLIENT_SECRET, GOOGLE_CLIENT_SECRET)"
                    .to_string(),
            ));
        }
        (None, Some(_)) => {
            return Err(InfraError::InvalidConfig(
                "missing google client id (set one of: AKITIME_GOOGLE_CLIENT_ID, GOOGLE_CLIENT_ID)"
                    .to_string(),
            ));
        }
    };

    Ok(AppConfig {
        oauth,
        calendar_id: optional_lookup_value(&lookup, &["AKITIME_CALENDAR_ID"])
            .or(file.calendar_id)
            .unwrap_or(defaults.calendar_id),
        calendar_api_base: optional_lookup_value(&lookup, &["AKITIME_CALENDAR_API_BASE"])
            .or(file.calendar_api_base)
            .unwrap_or(defaults.calendar_api_base),
        timezone,
        lookback_days,
        max_results,
        relay_max_results,
        host: optional_lookup_value(&lookup, &["AKITIME_HOST"])
            .or(file.host)
            .unwrap_or(defaults.host),
        port,
    })
}

pub fn parse_timezone(name: &str) -> Result<Tz, InfraError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|error| InfraError::InvalidConfig(format!("invalid timezone '{name}': {error}")))
}

fn parse_number<T: std::str::FromStr>(raw: &str, key: &str) -> Result<T, InfraError>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|error| InfraError::InvalidConfig(format!("invalid {key} '{raw}': {error}")))
}

fn optional_lookup_value<F>(lookup: &F, keys: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    for key in keys {
        if let Some(value) = lookup(key) {
            let normalized = value.trim();
            if !normalized.is_empty() {
                return Some(normalized.to_string());
            }
        }
    }
    None
}

fn parse_scope_list(raw: &str) -> Vec<String> {
    raw.split([',', ' ', '\n', '\t'])
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}
