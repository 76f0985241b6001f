//! Human-readable size and age formatting for cache reporting

use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Byte count with a human-readable `Display`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ByteSize(pub u64);

impl ByteSize {
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    pub fn to_human_readable(&self) -> String {
        const UNITS: &[(&str, u64)] = &[
            ("B", 1),
            ("KB", 1024),
            ("MB", 1024 * 1024),
            ("GB", 1024 * 1024 * 1024),
            ("TB", 1024 * 1024 * 1024 * 1024),
        ];

        for &(unit, divisor) in UNITS.iter().rev() {
            if self.0 >= divisor {
                let value = self.0 / divisor;
                let decimal = (self.0 % divisor) * 10 / divisor;
                if decimal > 0 && divisor > 1 {
                    return format!("{}.{}{}", value, decimal, unit);
                }
                return format!("{}{}", value, unit);
            }
        }

        format!("{}B", self.0)
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_human_readable())
    }
}

impl std::ops::AddAssign for ByteSize {
    fn add_assign(&mut self, rhs: Self) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

/// Coarse age string ("3d", "5h", "12m", "40s") for cache listings
pub fn format_age(age: Duration) -> String {
    let secs = age.as_secs();
    match secs {
        s if s >= 86_400 => format!("{}d", s / 86_400),
        s if s >= 3_600 => format!("{}h", s / 3_600),
        s if s >= 60 => format!("{}m", s / 60),
        s => format!("{}s", s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_human_readable() {
        assert_eq!(ByteSize(0).to_human_readable(), "0B");
        assert_eq!(ByteSize(512).to_human_readable(), "512B");
        assert_eq!(ByteSize(1024).to_human_readable(), "1KB");
        assert_eq!(ByteSize(1536).to_human_readable(), "1.5KB");
        assert_eq!(ByteSize(5 * 1024 * 1024).to_human_readable(), "5MB");
        assert_eq!(ByteSize(50 * 1024 * 1024 * 1024).to_human_readable(), "50GB");
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", ByteSize(1024)), "1KB");
        assert_eq!(format!("{}", ByteSize(5 * 1024 * 1024)), "5MB");
    }

    #[test]
    fn test_add_assign_saturates() {
        let mut total = ByteSize(u64::MAX - 1);
        total += ByteSize(10);
        assert_eq!(total.as_u64(), u64::MAX);
    }

    #[test]
    fn test_serializes_as_plain_number() {
        let json = serde_json::to_string(&ByteSize(2048)).unwrap();
        assert_eq!(json, "2048");
    }

    #[test]
    fn test_format_age() {
        assert_eq!(format_age(Duration::from_secs(40)), "40s");
        assert_eq!(format_age(Duration::from_secs(12 * 60)), "12m");
        assert_eq!(format_age(Duration::from_secs(5 * 3600)), "5h");
        assert_eq!(format_age(Duration::from_secs(3 * 86_400 + 10)), "3d");
    }
}
