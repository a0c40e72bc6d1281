//! # Sale Numbers
//!
//! Human-readable sale identifiers of the form `SAL-YYYYMMDD-NNNNN`.
//!
//! ```text
//! SAL-20240115-00001   first sale of 15 Jan 2024
//! SAL-20240115-00002   second
//! SAL-20240116-00001   counter restarts each day
//! ```
//!
//! The counter itself lives in storage (one row per day, incremented inside
//! the sale transaction). This module only formats and parses.

use chrono::NaiveDate;

use crate::error::ValidationError;
use crate::validation::ValidationResult;

/// Prefix shared by every sale number.
pub const SALE_NUMBER_PREFIX: &str = "SAL";

/// Highest sequence value that fits the 5-digit suffix.
pub const MAX_DAILY_SEQUENCE: i64 = 99_999;

/// Storage key of the daily counter: `YYYYMMDD`.
pub fn day_key(day: NaiveDate) -> String {
    day.format("%Y%m%d").to_string()
}

/// Formats a sale number.
///
/// ```rust
/// use chrono::NaiveDate;
/// use meridian_core::sale_number::format_sale_number;
///
/// let day = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
/// assert_eq!(format_sale_number(day, 7).unwrap(), "SAL-20240115-00007");
/// ```
pub fn format_sale_number(day: NaiveDate, sequence: i64) -> ValidationResult<String> {
    if !(1..=MAX_DAILY_SEQUENCE).contains(&sequence) {
        return Err(ValidationError::OutOfRange {
            field: "sale sequence".to_string(),
            min: 1,
            max: MAX_DAILY_SEQUENCE,
        });
    }
    Ok(format!(
        "{}-{}-{:05}",
        SALE_NUMBER_PREFIX,
        day_key(day),
        sequence
    ))
}

/// Parses a sale number back into its day and sequence.
pub fn parse_sale_number(value: &str) -> ValidationResult<(NaiveDate, i64)> {
    let invalid = |reason: &str| ValidationError::InvalidFormat {
        field: "sale_number".to_string(),
        reason: reason.to_string(),
    };

    let mut parts = value.split('-');
    let (prefix, day, seq) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(p), Some(d), Some(s), None) => (p, d, s),
        _ => return Err(invalid("expected SAL-YYYYMMDD-NNNNN")),
    };

    if prefix != SALE_NUMBER_PREFIX {
        return Err(invalid("unknown prefix"));
    }
    if day.len() != 8 || seq.len() != 5 {
        return Err(invalid("expected SAL-YYYYMMDD-NNNNN"));
    }

    let day = NaiveDate::parse_from_str(day, "%Y%m%d").map_err(|_| invalid("invalid date"))?;
    let seq: i64 = seq.parse().map_err(|_| invalid("invalid sequence"))?;
    if seq < 1 {
        return Err(invalid("sequence starts at 1"));
    }

    Ok((day, seq))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    #[test]
    fn test_format() {
        assert_eq!(format_sale_number(day(), 1).unwrap(), "SAL-20240115-00001");
        assert_eq!(
            format_sale_number(day(), MAX_DAILY_SEQUENCE).unwrap(),
            "SAL-20240115-99999"
        );
        assert!(format_sale_number(day(), 0).is_err());
        assert!(format_sale_number(day(), MAX_DAILY_SEQUENCE + 1).is_err());
    }

    #[test]
    fn test_parse() {
        assert_eq!(parse_sale_number("SAL-20240115-00042").unwrap(), (day(), 42));
        assert!(parse_sale_number("INV-20240115-00042").is_err());
        assert!(parse_sale_number("SAL-2024011-00042").is_err());
        assert!(parse_sale_number("SAL-20241315-00042").is_err());
        assert!(parse_sale_number("SAL-20240115-00000").is_err());
        assert!(parse_sale_number("SAL-20240115-00042-1").is_err());
    }

    #[test]
    fn test_numbers_sort_by_sequence_within_day() {
        let a = format_sale_number(day(), 9).unwrap();
        let b = format_sale_number(day(), 10).unwrap();
        assert!(a < b);
    }
}
