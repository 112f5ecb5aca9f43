use std::{env, fmt::Display, net::SocketAddr, str::FromStr};

use anyhow::{anyhow, Context};
use chrono_tz::Tz;
use cron::Schedule;
use tracing::{info, warn};

use crate::report::TimestampLocale;
use crate::window::DEFAULT_WINDOW_DAYS;

pub const DEFAULT_SWEEP_CRON: &str = "0 0 * * *";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub bind: SocketAddr,
    pub report: ReportSettings,
    pub retention_days: u32,
    pub sweep_schedule: Schedule,
    pub api_token: Option<String>,
}

/// Knobs that shape report content: window length and how the generation
/// timestamp is printed. The window itself is always computed in UTC.
#[derive(Debug, Clone)]
pub struct ReportSettings {
    pub window_days: u32,
    pub timezone: Tz,
    pub locale: TimestampLocale,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
            timezone: chrono_tz::UTC,
            locale: TimestampLocale::EnUs,
        }
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let timezone: String = try_load("REPORT_TIMEZONE", "UTC")?;
        let timezone = timezone
            .parse::<Tz>()
            .map_err(|err| anyhow!("invalid REPORT_TIMEZONE {timezone:?}: {err}"))?;
        let locale: String = try_load("REPORT_LOCALE", "en-US")?;
        let sweep_cron: String = try_load("SWEEP_CRON", DEFAULT_SWEEP_CRON)?;

        Ok(Self {
            database_url: env::var("DATABASE_URL").ok(),
            bind: try_load("BIND_ADDR", "0.0.0.0:5000")?,
            report: ReportSettings {
                window_days: try_load("REPORT_WINDOW_DAYS", "30")?,
                timezone,
                locale: TimestampLocale::parse(&locale),
            },
            retention_days: try_load("RETENTION_DAYS", "30")?,
            sweep_schedule: parse_cron(&sweep_cron)?,
            api_token: env::var("API_TOKEN").ok().filter(|token| !token.trim().is_empty()),
        })
    }

    pub fn database_url(&self) -> anyhow::Result<&str> {
        self.database_url
            .as_deref()
            .context("DATABASE_URL must be set to a production Postgres instance")
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> anyhow::Result<T>
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    raw.trim().parse().map_err(|err| {
        warn!("Invalid {key} value: {err}");
        anyhow!("invalid {key} value {raw:?}: {err}")
    })
}

/// Accepts a standard five-field expression; the cron crate wants a leading
/// seconds field.
pub fn parse_cron(expr: &str) -> anyhow::Result<Schedule> {
    format!("0 {}", expr.trim())
        .parse::<Schedule>()
        .map_err(|err| anyhow!("invalid cron expression {expr:?}: {err}"))
}
