use chrono::{DateTime, Duration, Utc};

#[must_use]
pub fn format_clock_time(value: DateTime<Utc>) -> String {
    value.format("%H:%M:%S").to_string()
}

/// Seconds with two decimals, e.g. `12.25 s`.
#[must_use]
pub fn format_secs(secs: f64) -> String {
    format!("{secs:.2} s")
}

/// `m:ss` below an hour, `h:mm:ss` above.
#[must_use]
pub fn format_elapsed(value: Duration) -> String {
    let total = value.num_seconds().max(0);
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use usability_core::time::fixed_now;

    #[test]
    fn formats_elapsed_durations() {
        assert_eq!(format_elapsed(Duration::seconds(9)), "0:09");
        assert_eq!(format_elapsed(Duration::seconds(125)), "2:05");
        assert_eq!(format_elapsed(Duration::seconds(3723)), "1:02:03");
        assert_eq!(format_elapsed(Duration::seconds(-5)), "0:00");
    }

    #[test]
    fn formats_clock_and_seconds() {
        assert_eq!(format_clock_time(fixed_now()), "22:13:20");
        assert_eq!(format_secs(3.5), "3.50 s");
    }
}
