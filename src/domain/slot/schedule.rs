use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};

use crate::utils::error::AppError;

const LOCAL_FORMATS: [&str; 2] = ["%d.%m.%Y %H:%M:%S", "%d.%m.%Y %H:%M"];

/// Parses a slot time into UTC.
///
/// Accepts RFC 3339, or `DD.MM.YYYY HH:MM[:SS]` interpreted in the given UTC offset.
pub fn parse_slot_datetime(raw: &str, utc_offset_hours: i32) -> Result<NaiveDateTime, AppError> {
    let raw = raw.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc).naive_utc());
    }

    let offset = utc_offset_hours
        .checked_mul(3600)
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| {
            AppError::InternalError(format!("Invalid schedule UTC offset: {}", utc_offset_hours))
        })?;

    let local = LOCAL_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .ok_or_else(|| {
            AppError::InvalidSlotDatetime(
                "Use DD.MM.YYYY HH:MM, for example 31.12.2030 19:30.".to_string(),
            )
        })?;

    offset
        .from_local_datetime(&local)
        .single()
        .map(|at| at.with_timezone(&Utc).naive_utc())
        .ok_or_else(|| AppError::InvalidSlotDatetime("Ambiguous local time.".to_string()))
}

/// Slot times must be strictly after `now`.
pub fn ensure_future(at: NaiveDateTime, now: NaiveDateTime) -> Result<(), AppError> {
    if at <= now {
        return Err(AppError::InvalidSlotDatetime(
            "Slot time must be in the future.".to_string(),
        ));
    }
    Ok(())
}
