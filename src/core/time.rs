use chrono::{DateTime, Duration, Utc};

use crate::core::error::EngineError;

pub fn now_utc() -> DateTime<Utc> {
    if let Ok(value) = std::env::var("NW_FIXED_TIME") {
        if let Ok(dt) = DateTime::parse_from_rfc3339(&value) {
            return dt.with_timezone(&Utc);
        }
    }
    Utc::now()
}

/// Longest look-back accepted by [`parse_range`].
pub const MAX_RANGE_DAYS: i64 = 36_500;

/// Parses a look-back range such as `24h`, `7d`, `30d`, `90d` or `1y`.
/// Ranges longer than [`MAX_RANGE_DAYS`] are rejected.
pub fn parse_range(value: &str) -> Result<Duration, EngineError> {
    let trimmed = value.trim().to_lowercase();
    let invalid = || EngineError::invalid(format!("invalid range (use 24h|7d|30d|90d|1y): {}", value));
    let (count, hours_per_unit) = if let Some(n) = trimmed.strip_suffix('h') {
        (n, 1)
    } else if let Some(n) = trimmed.strip_suffix('d') {
        (n, 24)
    } else if let Some(n) = trimmed.strip_suffix('y') {
        (n, 24 * 365)
    } else {
        return Err(invalid());
    };
    let count: i64 = count.parse().map_err(|_| invalid())?;
    if count <= 0 {
        return Err(invalid());
    }
    let hours = count
        .checked_mul(hours_per_unit)
        .filter(|h| *h <= MAX_RANGE_DAYS * 24)
        .ok_or_else(|| {
            EngineError::invalid(format!(
                "range too long (max {} days): {}",
                MAX_RANGE_DAYS, value
            ))
        })?;
    Duration::try_hours(hours).ok_or_else(invalid)
}

/// Start of a look-back window ending at `now`; saturates at the earliest
/// representable instant.
pub fn window_start(now: DateTime<Utc>, range: Duration) -> DateTime<Utc> {
    now.checked_sub_signed(range)
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

pub fn time_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = now.signed_duration_since(then).num_minutes();
    if minutes >= 60 {
        format!("{}h ago", minutes / 60)
    } else if minutes > 0 {
        format!("{}m ago", minutes)
    } else {
        "just now".to_string()
    }
}
