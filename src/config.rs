use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,
    pub db_max_connections: u32,
    pub log_dir: String,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_register_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    // Attendance rules
    pub late_grace_minutes: i64,
    pub default_profile_picture: String,
    pub report_title: String,

    pub smtp: SmtpConfig,
}

/// Outbound mail settings. Mail is disabled when `host` is unset.
#[derive(Clone, Debug, Default)]
pub struct SmtpConfig {
    pub host: Option<String>,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: Option<String>,
    /// Extra recipients copied on every attendance email
    pub notify_cc: Vec<String>,
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(v) => v
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{key} has an invalid value {v:?}: {e}")),
        None => Ok(default),
    }
}

/// Longest accepted grace period after opening: twelve hours.
const MAX_GRACE_MINUTES: i64 = 720;

fn grace_minutes(minutes: i64) -> Result<i64> {
    if (0..=MAX_GRACE_MINUTES).contains(&minutes) {
        Ok(minutes)
    } else {
        Err(anyhow::anyhow!(
            "LATE_GRACE_MINUTES must be between 0 and {MAX_GRACE_MINUTES}, got {minutes}"
        ))
    }
}

fn split_list(raw: Option<String>) -> Vec<String> {
    raw.map(|v| {
        v.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    })
    .unwrap_or_default()
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            access_token_ttl: parse_or("ACCESS_TOKEN_TTL", optional("ACCESS_TOKEN_TTL"), 900)?, // 15 min
            refresh_token_ttl: parse_or("REFRESH_TOKEN_TTL", optional("REFRESH_TOKEN_TTL"), 604_800)?, // 7 days
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", optional("DB_MAX_CONNECTIONS"), 10)?,
            log_dir: optional("LOG_DIR").unwrap_or_else(|| "logs".to_string()),

            rate_login_per_min: parse_or("RATE_LOGIN_PER_MIN", optional("RATE_LOGIN_PER_MIN"), 60)?,
            rate_register_per_min: parse_or(
                "RATE_REGISTER_PER_MIN",
                optional("RATE_REGISTER_PER_MIN"),
                30,
            )?,
            rate_refresh_per_min: parse_or(
                "RATE_REFRESH_PER_MIN",
                optional("RATE_REFRESH_PER_MIN"),
                30,
            )?,
            rate_protected_per_min: parse_or(
                "RATE_PROTECTED_PER_MIN",
                optional("RATE_PROTECTED_PER_MIN"),
                1000,
            )?,

            api_prefix: optional("API_PREFIX").unwrap_or_else(|| "/api".to_string()),

            late_grace_minutes: grace_minutes(parse_or(
                "LATE_GRACE_MINUTES",
                optional("LATE_GRACE_MINUTES"),
                0,
            )?)?,
            default_profile_picture: optional("DEFAULT_PROFILE_PICTURE")
                .unwrap_or_else(|| "/static/images/child_pix/user-default.png".to_string()),
            report_title: optional("REPORT_TITLE")
                .unwrap_or_else(|| "Childcare Center".to_string()),

            smtp: SmtpConfig {
                host: optional("SMTP_HOST"),
                port: parse_or("SMTP_PORT", optional("SMTP_PORT"), 587)?,
                username: optional("SMTP_USERNAME"),
                password: optional("SMTP_PASSWORD"),
                from: optional("SMTP_FROM"),
                notify_cc: split_list(optional("NOTIFY_CC")),
            },
        })
    }
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Self {
        Self {
            database_url: "mysql://root@127.0.0.1:3306/childcare_test".to_string(),
            jwt_secret: "test-secret".to_string(),
            server_addr: "127.0.0.1:0".to_string(),
            access_token_ttl: 900,
            refresh_token_ttl: 3600,
            db_max_connections: 1,
            log_dir: "logs".to_string(),
            rate_login_per_min: 60,
            rate_register_per_min: 30,
            rate_refresh_per_min: 30,
            rate_protected_per_min: 1000,
            api_prefix: "/api".to_string(),
            late_grace_minutes: 0,
            default_profile_picture: "/static/images/child_pix/user-default.png".to_string(),
            report_title: "Childcare Center".to_string(),
            smtp: SmtpConfig::default(),
        }
    }
}
