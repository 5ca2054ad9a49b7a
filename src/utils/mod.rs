pub mod time_of_day;

/// Format a span of seconds as `H:MM:SS` for log output
pub fn format_span(secs: i64) -> String {
    let sign = if secs < 0 { "-" } else { "" };
    let secs = secs.unsigned_abs();
    format!(
        "{}{}:{:02}:{:02}",
        sign,
        secs / 3600,
        (secs / 60) % 60,
        secs % 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_span() {
        assert_eq!(format_span(0), "0:00:00");
        assert_eq!(format_span(59), "0:00:59");
        assert_eq!(format_span(2700), "0:45:00");
        assert_eq!(format_span(14_461), "4:01:01");
        assert_eq!(format_span(-90), "-0:01:30");
    }
}
