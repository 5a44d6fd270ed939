/// Renders a seconds value as zero-padded `HH:MM:SS` for display.
///
/// Fractional seconds are truncated, negative values clamp to
/// `00:00:00`, non-finite values render as `N/A`, and hours are
/// unbounded rather than wrapping at 24.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() {
        return "N/A".to_string();
    }
    let total = seconds as i64;
    if total < 0 {
        return "00:00:00".to_string();
    }
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_clamps_to_zero() {
        assert_eq!(format_time(-5.0), "00:00:00");
    }

    #[test]
    fn non_finite_renders_as_na() {
        assert_eq!(format_time(f64::NAN), "N/A");
        assert_eq!(format_time(f64::INFINITY), "N/A");
    }

    #[test]
    fn formats_hours_minutes_seconds() {
        assert_eq!(format_time(0.0), "00:00:00");
        assert_eq!(format_time(3661.0), "01:01:01");
        assert_eq!(format_time(4513.92), "01:15:13");
    }

    #[test]
    fn hours_do_not_wrap_at_24() {
        assert_eq!(format_time(360_061.0), "100:01:01");
    }
}
