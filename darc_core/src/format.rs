//! Fixed-width formatting for archive listings.

use chrono::{DateTime, TimeZone};
use std::fmt::Display;

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;
const GIB: u64 = 1024 * MIB;

/// Format a timestamp for `ls`-style output.
///
/// Entries younger than a year show the time of day, older ones the year.
pub fn format_time<Tz>(time: &DateTime<Tz>, now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let age = now.clone().signed_duration_since(time.clone());
    if age.num_days() < 365 {
        time.format("%b %d %H:%M").to_string()
    } else {
        time.format("%b %d  %Y").to_string()
    }
}

/// Format the permission bits of `mode` as `rwxrwxrwx`.
pub fn format_file_mode(mode: u32) -> String {
    let mut out = String::with_capacity(9);
    for shift in [6, 3, 0] {
        let bits = (mode >> shift) & 0o7;
        out.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        out.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        out.push(if bits & 0o1 != 0 { 'x' } else { '-' });
    }
    out
}

/// Format a byte count with a binary unit suffix.
pub fn format_file_size(size: u64) -> String {
    if size > GIB {
        format!("{:.2} GB", size as f64 / GIB as f64)
    } else if size > MIB {
        format!("{:.2} MB", size as f64 / MIB as f64)
    } else if size > KIB {
        format!("{:.2} kB", size as f64 / KIB as f64)
    } else {
        size.to_string()
    }
}

/// Left-pad `data` with zero bytes to `len` bytes.
///
/// Data already `len` bytes or longer is returned unchanged.
pub fn zero_pad(data: &[u8], len: usize) -> Vec<u8> {
    let mut out = vec![0u8; len.saturating_sub(data.len())];
    out.extend_from_slice(data);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[test]
    fn test_format_time_recent() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let then = Utc.with_ymd_and_hms(2024, 3, 5, 9, 7, 0).unwrap();
        assert_eq!(format_time(&then, &now), "Mar 05 09:07");
    }

    #[test]
    fn test_format_time_old() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let then = Utc.with_ymd_and_hms(2021, 12, 24, 18, 30, 0).unwrap();
        assert_eq!(format_time(&then, &now), "Dec 24  2021");
    }

    #[test]
    fn test_format_time_year_boundary() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        assert!(format_time(&(now - Duration::days(364)), &now).ends_with("12:00"));
        assert!(format_time(&(now - Duration::days(365)), &now).ends_with("2023"));
    }

    #[test]
    fn test_format_time_future() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let later = now + Duration::days(800);
        assert_eq!(format_time(&later, &now), "Aug 10 12:00");
    }

    #[test]
    fn test_format_file_mode() {
        assert_eq!(format_file_mode(0o755), "rwxr-xr-x");
        assert_eq!(format_file_mode(0o644), "rw-r--r--");
        assert_eq!(format_file_mode(0o100600), "rw-------");
        assert_eq!(format_file_mode(0), "---------");
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0");
        assert_eq!(format_file_size(1024), "1024");
        assert_eq!(format_file_size(1536), "1.50 kB");
        assert_eq!(format_file_size(5 * MIB + MIB / 4), "5.25 MB");
        assert_eq!(format_file_size(3 * GIB), "3.00 GB");
    }

    #[test]
    fn test_zero_pad() {
        assert_eq!(zero_pad(b"foo", 5), b"\0\0foo".to_vec());
        assert_eq!(zero_pad(b"foo", 3), b"foo".to_vec());
        assert_eq!(zero_pad(b"foobar", 3), b"foobar".to_vec());
    }
}
