//! Time and rate formatting for reports

/// Rate per second over a whole-second interval
///
/// Intervals shorter than one second are treated as one second, so a report
/// emitted right after start never divides by zero.
pub fn per_second(amount: u64, seconds: u64) -> f64 {
    amount as f64 / seconds.max(1) as f64
}

/// Format an elapsed second count as `[Nd ]HH:MM:SS`
///
/// # Examples
///
/// ```
/// use disktest::util::time::format_elapsed;
///
/// assert_eq!(format_elapsed(59), "00:00:59");
/// assert_eq!(format_elapsed(3_723), "01:02:03");
/// assert_eq!(format_elapsed(90_061), "1d 01:01:01");
/// ```
pub fn format_elapsed(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;
    let secs = seconds % 60;

    if days > 0 {
        format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, secs)
    } else {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    }
}

/// Format a rate (operations per second)
///
/// # Examples
///
/// ```
/// use disktest::util::time::format_rate;
///
/// assert_eq!(format_rate(500.0), "500");
/// assert_eq!(format_rate(1500.0), "1.50K");
/// assert_eq!(format_rate(2_500_000.0), "2.50M");
/// ```
pub fn format_rate(rate: f64) -> String {
    if rate < 1_000.0 {
        format!("{:.0}", rate)
    } else if rate < 1_000_000.0 {
        format!("{:.2}K", rate / 1_000.0)
    } else if rate < 1_000_000_000.0 {
        format!("{:.2}M", rate / 1_000_000.0)
    } else {
        format!("{:.2}G", rate / 1_000_000_000.0)
    }
}

/// Format throughput in human-readable form (B/s, KB/s, MB/s, GB/s)
pub fn format_throughput(bytes_per_sec: f64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    if bytes_per_sec >= GB {
        format!("{:.2} GB/s", bytes_per_sec / GB)
    } else if bytes_per_sec >= MB {
        format!("{:.2} MB/s", bytes_per_sec / MB)
    } else if bytes_per_sec >= KB {
        format!("{:.2} KB/s", bytes_per_sec / KB)
    } else {
        format!("{:.2} B/s", bytes_per_sec)
    }
}
