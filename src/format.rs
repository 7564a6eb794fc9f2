//! Display helpers shared by the resource clients

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Parse a decimal string as sent by the backend. A comma is accepted as the
/// decimal separator.
pub fn parse_decimal(value: &str) -> Option<Decimal> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    Decimal::from_str(&value.replacen(',', ".", 1)).ok()
}

/// Round to cents the way prices are shown
pub fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Brazilian currency display: `R$ 49,90`
pub fn format_brl(value: Decimal) -> String {
    format!("R$ {:.2}", round_cents(value)).replace('.', ",")
}

/// Backend timestamp: RFC 3339, naive `YYYY-MM-DDTHH:MM:SS` (read as UTC) or
/// a bare `YYYY-MM-DD` (midnight UTC)
pub fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, pattern) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// `dd/mm/yyyy`, or the input unchanged when it is not a date
pub fn format_date_br(value: &str) -> String {
    match parse_datetime(value) {
        Some(dt) => dt.format("%d/%m/%Y").to_string(),
        None => value.to_string(),
    }
}

/// Keep only the ASCII digits of a string
pub fn digits(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

/// Serde helper for fields the backend sends either as a string or a number
pub(crate) fn string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_parse_decimal_accepts_comma() {
        assert_eq!(parse_decimal("49,90"), Some(Decimal::new(4990, 2)));
        assert_eq!(parse_decimal("49.90"), Some(Decimal::new(4990, 2)));
        assert_eq!(parse_decimal(""), None);
        assert_eq!(parse_decimal("abc"), None);
    }

    #[test]
    fn test_format_brl() {
        assert_eq!(format_brl(Decimal::new(4990, 2)), "R$ 49,90");
        assert_eq!(format_brl(Decimal::new(5, 0)), "R$ 5,00");
        assert_eq!(format_brl(Decimal::new(12345, 3)), "R$ 12,35");
    }

    #[test]
    fn test_parse_datetime_shapes() {
        let full = parse_datetime("2024-03-01T10:00:00-03:00").unwrap();
        assert_eq!(full.to_rfc3339(), "2024-03-01T13:00:00+00:00");

        let naive = parse_datetime("2024-03-01T10:00:00.123456").unwrap();
        assert_eq!(naive.day(), 1);

        let date = parse_datetime("2024-12-31").unwrap();
        assert_eq!(date.month(), 12);

        assert!(parse_datetime("31/12/2024").is_none());
    }

    #[test]
    fn test_format_date_br() {
        assert_eq!(format_date_br("2024-01-15T12:00:00Z"), "15/01/2024");
        assert_eq!(format_date_br("n/a"), "n/a");
    }
}
