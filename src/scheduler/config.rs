//! Scheduler tunables. Parsed tolerantly: an invalid or missing value falls
//! back to the documented default and logs a warning rather than failing
//! startup (§4.1 — this is narrower than `crate::config::Config::from_env`,
//! which hard-fails on a missing `DATABASE_URL`; here only the scheduler's
//! own timing knobs get the soft-fallback treatment).

use std::time::Duration;

use chrono::Weekday;
use chrono_tz::Tz;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub delta_interval: Duration,
    pub full_day: Weekday,
    pub full_time: (u32, u32),
    pub cleanup_time: (u32, u32),
    pub keep_full: i64,
    pub keep_delta: i64,
    pub timezone: Tz,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            delta_interval: Duration::from_secs(3600),
            full_day: Weekday::Sun,
            full_time: (2, 0),
            cleanup_time: (3, 0),
            keep_full: 2,
            keep_delta: 5,
            timezone: chrono_tz::UTC,
        }
    }
}

fn warn_fallback<T: std::fmt::Debug>(var: &str, raw: &str, default: T) -> T {
    tracing::warn!(var, raw, ?default, "invalid scheduler config value, using default");
    default
}

fn parse_duration_floor_1m(var: &str, raw: &str, default: Duration) -> Duration {
    match raw.parse::<u64>() {
        Ok(secs) => Duration::from_secs(secs.max(60)),
        Err(_) => warn_fallback(var, raw, default),
    }
}

fn parse_weekday(var: &str, raw: &str, default: Weekday) -> Weekday {
    match raw.to_ascii_lowercase().as_str() {
        "mon" | "monday" => Weekday::Mon,
        "tue" | "tuesday" => Weekday::Tue,
        "wed" | "wednesday" => Weekday::Wed,
        "thu" | "thursday" => Weekday::Thu,
        "fri" | "friday" => Weekday::Fri,
        "sat" | "saturday" => Weekday::Sat,
        "sun" | "sunday" => Weekday::Sun,
        _ => warn_fallback(var, raw, default),
    }
}

fn parse_hhmm(var: &str, raw: &str, default: (u32, u32)) -> (u32, u32) {
    let Some((h, m)) = raw.split_once(':') else {
        return warn_fallback(var, raw, default);
    };
    match (h.parse::<u32>(), m.parse::<u32>()) {
        (Ok(h), Ok(m)) if h < 24 && m < 60 => (h, m),
        _ => warn_fallback(var, raw, default),
    }
}

fn parse_positive_i64(var: &str, raw: &str, default: i64) -> i64 {
    match raw.parse::<i64>() {
        Ok(n) if n >= 1 => n,
        _ => warn_fallback(var, raw, default),
    }
}

fn parse_tz(var: &str, raw: &str, default: Tz) -> Tz {
    match raw.parse::<Tz>() {
        Ok(tz) => tz,
        Err(_) => warn_fallback(var, raw, default),
    }
}

impl SchedulerConfig {
    /// Build from environment, falling back field-by-field on any parse
    /// failure. Never returns an error.
    pub fn from_env() -> Self {
        let default = Self::default();

        let delta_interval = std::env::var("SCHEDULER_DELTA_INTERVAL_SECS")
            .ok()
            .map(|raw| parse_duration_floor_1m("SCHEDULER_DELTA_INTERVAL_SECS", &raw, default.delta_interval))
            .unwrap_or(default.delta_interval);

        let full_day = std::env::var("SCHEDULER_FULL_DAY")
            .ok()
            .map(|raw| parse_weekday("SCHEDULER_FULL_DAY", &raw, default.full_day))
            .unwrap_or(default.full_day);

        let full_time = std::env::var("SCHEDULER_FULL_TIME")
            .ok()
            .map(|raw| parse_hhmm("SCHEDULER_FULL_TIME", &raw, default.full_time))
            .unwrap_or(default.full_time);

        let cleanup_time = std::env::var("SCHEDULER_CLEANUP_TIME")
            .ok()
            .map(|raw| parse_hhmm("SCHEDULER_CLEANUP_TIME", &raw, default.cleanup_time))
            .unwrap_or(default.cleanup_time);

        let keep_full = std::env::var("SCHEDULER_KEEP_FULL")
            .ok()
            .map(|raw| parse_positive_i64("SCHEDULER_KEEP_FULL", &raw, default.keep_full))
            .unwrap_or(default.keep_full);

        let keep_delta = std::env::var("SCHEDULER_KEEP_DELTA")
            .ok()
            .map(|raw| parse_positive_i64("SCHEDULER_KEEP_DELTA", &raw, default.keep_delta))
            .unwrap_or(default.keep_delta);

        let timezone = std::env::var("SCHEDULER_TIMEZONE")
            .ok()
            .map(|raw| parse_tz("SCHEDULER_TIMEZONE", &raw, default.timezone))
            .unwrap_or(default.timezone);

        Self {
            delta_interval,
            full_day,
            full_time,
            cleanup_time,
            keep_full,
            keep_delta,
            timezone,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let config = SchedulerConfig::default();
        assert_eq!(config.delta_interval, Duration::from_secs(3600));
        assert_eq!(config.full_day, Weekday::Sun);
        assert_eq!(config.full_time, (2, 0));
        assert_eq!(config.cleanup_time, (3, 0));
        assert_eq!(config.keep_full, 2);
        assert_eq!(config.keep_delta, 5);
    }

    #[test]
    fn delta_interval_floors_at_one_minute() {
        let floored = parse_duration_floor_1m("x", "10", Duration::from_secs(3600));
        assert_eq!(floored, Duration::from_secs(60));
    }

    #[test]
    fn invalid_weekday_falls_back_to_default() {
        let day = parse_weekday("x", "someday", Weekday::Sun);
        assert_eq!(day, Weekday::Sun);
    }

    #[test]
    fn invalid_hhmm_falls_back_to_default() {
        let t = parse_hhmm("x", "25:99", (2, 0));
        assert_eq!(t, (2, 0));
    }

    #[test]
    fn zero_keep_count_falls_back_to_default() {
        let n = parse_positive_i64("x", "0", 2);
        assert_eq!(n, 2);
    }

    #[test]
    fn valid_weekday_is_parsed_case_insensitively() {
        assert_eq!(parse_weekday("x", "Monday", Weekday::Sun), Weekday::Mon);
    }
}
