// Server timestamp codec
//
// The forum writes local timestamps as `2020-06-21(日)13:32:45`: date, the
// Chinese weekday in parentheses, then time. Decoding ignores the weekday
// text (the server is not always right about it); encoding writes the
// correct one.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Weekday};

use crate::decode::DecodeError;

/// Parse a server timestamp. Anything unparseable fails with
/// [`DecodeError::Timestamp`] rather than falling back to a default.
pub fn parse_server_time(value: &str) -> Result<NaiveDateTime, DecodeError> {
    let invalid = || DecodeError::Timestamp {
        value: value.to_owned(),
    };

    let (date, rest) = value.trim().split_once('(').ok_or_else(invalid)?;
    let (_weekday, time) = rest.split_once(')').ok_or_else(invalid)?;

    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| invalid())?;
    let time = NaiveTime::parse_from_str(time, "%H:%M:%S").map_err(|_| invalid())?;
    Ok(date.and_time(time))
}

/// Format a timestamp the way the server writes it.
pub fn format_server_time(at: &NaiveDateTime) -> String {
    format!(
        "{}({}){}",
        at.format("%Y-%m-%d"),
        weekday_char(at.weekday()),
        at.format("%H:%M:%S")
    )
}

fn weekday_char(day: Weekday) -> char {
    match day {
        Weekday::Mon => '一',
        Weekday::Tue => '二',
        Weekday::Wed => '三',
        Weekday::Thu => '四',
        Weekday::Fri => '五',
        Weekday::Sat => '六',
        Weekday::Sun => '日',
    }
}

/// `#[serde(with = "server_time")]` adapter.
pub mod server_time {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(at: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_server_time(at))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_server_time(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_server_format() {
        let at = parse_server_time("2020-06-21(日)13:32:45").unwrap();
        assert_eq!(at.to_string(), "2020-06-21 13:32:45");
    }

    #[test]
    fn weekday_text_is_not_validated_on_input() {
        let at = parse_server_time("2020-06-21(Mon)13:32:45").unwrap();
        assert_eq!(at.weekday(), Weekday::Sun);
    }

    #[test]
    fn formats_with_correct_weekday() {
        let at = NaiveDate::from_ymd_opt(2020, 6, 22)
            .unwrap()
            .and_hms_opt(8, 5, 0)
            .unwrap();
        assert_eq!(format_server_time(&at), "2020-06-22(一)08:05:00");
        assert_eq!(parse_server_time(&format_server_time(&at)).unwrap(), at);
    }

    #[test]
    fn rejects_garbage_with_the_offending_value() {
        for bad in ["", "yesterday", "2020-06-21 13:32:45", "2020-13-40(日)25:00:00"] {
            let err = parse_server_time(bad).unwrap_err();
            assert_eq!(err.to_string(), format!("Unknown DateTime String: {bad}"));
        }
    }
}
