use chrono::{DateTime, NaiveDateTime, Utc};

/// 任务时间戳的线上格式，与工作进程约定一致；解析时允许省略小数秒
pub const WIRE_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

pub fn format_wire_timestamp(ts: DateTime<Utc>) -> String {
    ts.naive_utc().format(WIRE_TIMESTAMP_FORMAT).to_string()
}

/// 解析失败返回None，调用方将其视为"无该时间信息"
pub fn parse_wire_timestamp(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, WIRE_TIMESTAMP_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    #[test]
    fn test_parse_without_fraction() {
        let ts = parse_wire_timestamp("2023-01-02T00:00:00").unwrap();
        assert_eq!(
            ts,
            NaiveDate::from_ymd_opt(2023, 1, 2)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );
    }

    #[test]
    fn test_parse_with_microseconds() {
        let ts = parse_wire_timestamp("2023-01-02T03:04:05.678901").unwrap();
        assert_eq!(ts.format("%Y-%m-%d %H:%M:%S").to_string(), "2023-01-02 03:04:05");
    }

    #[test]
    fn test_parse_garbage_returns_none() {
        assert!(parse_wire_timestamp("not-a-date").is_none());
        assert!(parse_wire_timestamp("2023/01/02 00:00:00").is_none());
        assert!(parse_wire_timestamp("").is_none());
    }

    #[test]
    fn test_format_round_trip() {
        let ts = Utc.with_ymd_and_hms(2023, 5, 6, 7, 8, 9).unwrap();
        let formatted = format_wire_timestamp(ts);
        let parsed = parse_wire_timestamp(&formatted).unwrap();
        assert_eq!(parsed, ts.naive_utc());
    }

    #[test]
    fn test_parsed_timestamps_are_ordered() {
        let earlier = parse_wire_timestamp("2023-01-01T00:00:00").unwrap();
        let later = parse_wire_timestamp("2023-01-02T00:00:00").unwrap();
        assert!(later > earlier);
    }
}
