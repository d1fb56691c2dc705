//! Human-readable units for byte counts, speeds and durations.

use std::time::Duration;

/// Shown in place of a remaining time that cannot be estimated yet.
pub const COMPUTING: &str = "computing...";

const KIB: f64 = 1024.0;
const MIB: f64 = KIB * 1024.0;
const GIB: f64 = MIB * 1024.0;

/// Formats a byte count with binary prefixes, e.g. `512 B`, `1.5 MB`.
pub fn format_bytes(bytes: u64) -> String {
    const UNIT: u64 = 1024;
    if bytes < UNIT {
        return format!("{bytes} B");
    }
    let mut div = UNIT;
    let mut exp = 0;
    let mut n = bytes / UNIT;
    while n >= UNIT {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }
    let prefix = ['K', 'M', 'G', 'T', 'P', 'E'][exp];
    format!("{:.1} {prefix}B", bytes as f64 / div as f64)
}

/// Formats a rate in bytes per second, e.g. `12.3 MB/s`.
pub fn format_speed(bytes_per_sec: f64) -> String {
    let speed = if bytes_per_sec.is_finite() && bytes_per_sec > 0.0 {
        bytes_per_sec
    } else {
        0.0
    };
    if speed < KIB {
        format!("{speed:.0} B/s")
    } else if speed < MIB {
        format!("{:.1} KB/s", speed / KIB)
    } else if speed < GIB {
        format!("{:.1} MB/s", speed / MIB)
    } else {
        format!("{:.1} GB/s", speed / GIB)
    }
}

/// Formats a duration as `HhMmSs`, dropping leading zero units.
pub fn format_duration(d: Duration) -> String {
    let total = d.as_secs();
    let hours = total / 3600;
    let minutes = (total / 60) % 60;
    let seconds = total % 60;

    if hours > 0 {
        format!("{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m{seconds}s")
    } else {
        format!("{seconds}s")
    }
}

/// Formats an estimate that may not exist yet.
pub fn format_remaining(remaining: Option<Duration>) -> String {
    match remaining {
        Some(d) => format_duration(d),
        None => COMPUTING.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_below_one_kib() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
    }

    #[test]
    fn bytes_with_prefixes() {
        assert_eq!(format_bytes(1024), "1.0 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(10 * 1024 * 1024), "10.0 MB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.0 GB");
        assert_eq!(format_bytes(u64::MAX), "16.0 EB");
    }

    #[test]
    fn speed_units() {
        assert_eq!(format_speed(0.0), "0 B/s");
        assert_eq!(format_speed(512.0), "512 B/s");
        assert_eq!(format_speed(2048.0), "2.0 KB/s");
        assert_eq!(format_speed(5.5 * MIB), "5.5 MB/s");
        assert_eq!(format_speed(2.0 * GIB), "2.0 GB/s");
    }

    #[test]
    fn speed_rejects_nonsense() {
        assert_eq!(format_speed(-10.0), "0 B/s");
        assert_eq!(format_speed(f64::NAN), "0 B/s");
        assert_eq!(format_speed(f64::INFINITY), "0 B/s");
    }

    #[test]
    fn durations() {
        assert_eq!(format_duration(Duration::from_secs(0)), "0s");
        assert_eq!(format_duration(Duration::from_secs(59)), "59s");
        assert_eq!(format_duration(Duration::from_secs(61)), "1m1s");
        assert_eq!(format_duration(Duration::from_secs(3600)), "1h0m0s");
        assert_eq!(format_duration(Duration::from_secs(3723)), "1h2m3s");
    }

    #[test]
    fn remaining_sentinel() {
        assert_eq!(format_remaining(None), COMPUTING);
        assert_eq!(format_remaining(Some(Duration::from_secs(5))), "5s");
    }
}
