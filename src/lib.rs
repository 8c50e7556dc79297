#![deny(clippy::unwrap_used)]

use anyhow::Context;
use async_trait::async_trait;
use std::env;
use std::sync::Arc;
use time::macros::format_description;
use time::{Date, OffsetDateTime};
use time_tz::{timezones, OffsetDateTimeExt};
use tokio::sync::Notify;
use tokio::time::{sleep, Duration};

pub mod config;
pub mod engine;
pub mod fetch;
pub mod notify;
pub mod ozon;
pub mod postprocess;
pub mod push;
pub mod sheets;
pub mod wb;

/// Logger + `.env` bootstrap shared by every pipeline binary.
pub fn bootstrap() -> Result<(), anyhow::Error> {
    if let Err(env::VarError::NotPresent) = env::var("RUST_LOG") {
        env::set_var("RUST_LOG", "INFO");
    }
    pretty_env_logger::formatted_timed_builder()
        .parse_default_env()
        .init();

    match std::fs::File::open(".env") {
        Ok(_) => envmnt::load_file(".env")?,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            std::fs::File::create(".env")?;
            envmnt::load_file(".env")?;
        }
        Err(err) => {
            return Err(anyhow::anyhow!("Unable to open .env file: {err}"));
        }
    }
    Ok(())
}

pub fn env_var(key: &str) -> Result<String, anyhow::Error> {
    envmnt::get_parse::<_, String, _>(key)
        .map(|v| v.trim().to_string())
        .with_context(|| format!("{key} not set"))
}

pub struct RateLimiter(Arc<Notify>);

impl RateLimiter {
    pub fn new(rpm: u64) -> Self {
        let notify = Arc::new(Notify::new());
        let n = notify.clone();
        let duration = Duration::from_millis(60_000 / rpm);
        tokio::spawn(async move {
            let notify = n;
            loop {
                sleep(duration).await;
                notify.notify_one();
            }
        });
        Self(notify)
    }
}

#[async_trait]
impl reqwest_ratelimit::RateLimiter for RateLimiter {
    async fn acquire_permit(&self) {
        self.0.notified().await;
    }
}

const DATE_FMT: &[time::format_description::FormatItem<'static>] =
    format_description!("[year]-[month]-[day]");

/// Current date in the marketplaces' reporting timezone (Europe/Moscow).
pub fn moscow_today() -> Date {
    OffsetDateTime::now_utc()
        .to_timezone(timezones::db::europe::MOSCOW)
        .date()
}

/// Last seven full days, Moscow time: a week ago up to yesterday.
pub fn report_window() -> (Date, Date) {
    let today = moscow_today();
    (
        today - time::Duration::days(7),
        today - time::Duration::days(1),
    )
}

pub fn format_date(date: Date) -> String {
    date.format(DATE_FMT).unwrap_or_else(|_| date.to_string())
}

/// Parses the date part of `2024-05-01`-prefixed values, timestamps included.
pub fn parse_date_prefix(s: &str) -> Option<Date> {
    let prefix = s.get(..10)?;
    Date::parse(prefix, DATE_FMT).ok()
}

pub fn iso_week(date: Date) -> u8 {
    date.iso_week()
}

pub fn format_duration(duration: &std::time::Duration) -> String {
    let mut res = vec![];
    let days = duration.as_millis() / 1000 / 60 / 60 / 24;
    let hours = duration.as_millis() / 1000 / 60 / 60 % 24;
    let minutes = duration.as_millis() / 1000 / 60 % 60;
    let seconds = duration.as_millis() / 1000 % 60;
    let whole_millis = duration.as_millis();
    if days > 0 {
        res.push(format!("{days}д."));
    }
    if hours > 0 {
        res.push(format!("{hours}ч."));
    }
    if minutes > 0 {
        res.push(format!("{minutes}мин."));
    }
    if seconds > 0 {
        res.push(format!("{seconds}с."));
    }
    if whole_millis < 1000 {
        res.push(format!("{whole_millis}мс."));
    }
    itertools::intersperse(res, " ".to_string()).collect()
}

/// Keeps error bodies loggable without dumping whole payloads.
pub fn truncate_body(body: &str) -> String {
    const LIMIT: usize = 220;
    let trimmed = body.trim();
    if trimmed.len() <= LIMIT {
        return trimmed.to_string();
    }
    let mut end = 0usize;
    for (idx, _) in trimmed.char_indices() {
        if idx > LIMIT {
            break;
        }
        end = idx;
    }
    if end == 0 {
        return trimmed.to_string();
    }
    format!("{}…", &trimmed[..end])
}
