//! Clock-style time labels

/// Format seconds as `m:ss`, or `h:mm:ss` from one hour up.
///
/// Negative and non-finite inputs render as `0:00`.
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format_hms(total)
}

/// Format a whole-second countdown (sleep timer).
pub fn format_countdown(seconds: u32) -> String {
    format_hms(u64::from(seconds))
}

fn format_hms(total: u64) -> String {
    let h = total / 3600;
    let m = (total % 3600) / 60;
    let s = total % 60;
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_times() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(7.9), "0:07");
        assert_eq!(format_time(125.0), "2:05");
    }

    #[test]
    fn test_hour_times() {
        assert_eq!(format_time(3600.0), "1:00:00");
        assert_eq!(format_countdown(5400 + 61), "1:31:01");
    }

    #[test]
    fn test_garbage_input() {
        assert_eq!(format_time(f64::NAN), "0:00");
        assert_eq!(format_time(-3.0), "0:00");
    }
}
