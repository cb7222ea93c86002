//! Date helper functions

use chrono::{DateTime, Locale, TimeZone, Utc};

use crate::config::SiteConfig;

/// Resolve a language tag like `pt-BR` or `pt_BR` to a chrono locale
pub fn locale(language: &str) -> Locale {
    let tag = language.replace('-', "_");
    Locale::try_from(tag.as_str()).unwrap_or_else(|_| {
        tracing::warn!("Unknown language {:?}, formatting dates in en_US", language);
        Locale::en_US
    })
}

/// Format a date with a strftime pattern in the given locale
///
/// # Examples
/// ```ignore
/// format_date(&date, "%d %b %Y", Locale::pt_BR) // -> "15 mar 2021"
/// ```
pub fn format_date<Tz: TimeZone>(date: &DateTime<Tz>, format: &str, locale: Locale) -> String
where
    Tz::Offset: std::fmt::Display,
{
    date.format_localized(format, locale).to_string()
}

/// Format a date in ISO 8601 / XML format
pub fn date_xml<Tz: TimeZone>(date: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    date.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
}

/// The site's display date for a UTC timestamp
pub fn display_date(config: &SiteConfig, date: &DateTime<Utc>) -> String {
    let local = date.with_timezone(&config.tz());
    format_date(&local, &config.date_format, locale(&config.language))
}

/// The site's display time of day for a UTC timestamp
pub fn display_time(config: &SiteConfig, date: &DateTime<Utc>) -> String {
    let local = date.with_timezone(&config.tz());
    format_date(&local, &config.time_format, locale(&config.language))
}
