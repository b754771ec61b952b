use std::fmt;

/// A number of months.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Months(u32);

/// A number of days.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Days(u32);

/// A number of milliseconds.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Millis(u32);

macro_rules! duration_component {
    ($type:ty) => {
        impl From<u32> for $type {
            fn from(value: u32) -> Self {
                Self(value)
            }
        }

        impl From<$type> for u32 {
            fn from(component: $type) -> Self {
                component.0
            }
        }

        impl fmt::Display for $type {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

duration_component!(Months);
duration_component!(Days);
duration_component!(Millis);

/// The `duration` logical value: months, days and milliseconds, each an
/// unsigned 32-bit integer, stored on the wire as a little-endian fixed(12).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Duration {
    months: Months,
    days: Days,
    millis: Millis,
}

impl Duration {
    pub fn new(months: Months, days: Days, millis: Millis) -> Self {
        Self {
            months,
            days,
            millis,
        }
    }

    pub fn months(&self) -> Months {
        self.months
    }

    pub fn days(&self) -> Days {
        self.days
    }

    pub fn millis(&self) -> Millis {
        self.millis
    }
}

impl From<Duration> for [u8; 12] {
    fn from(duration: Duration) -> Self {
        let mut bytes = [0u8; 12];
        bytes[0..4].copy_from_slice(&duration.months.0.to_le_bytes());
        bytes[4..8].copy_from_slice(&duration.days.0.to_le_bytes());
        bytes[8..12].copy_from_slice(&duration.millis.0.to_le_bytes());
        bytes
    }
}

impl From<[u8; 12]> for Duration {
    fn from(bytes: [u8; 12]) -> Self {
        Self {
            months: Months(u32::from_le_bytes(bytes[0..4].try_into().unwrap())),
            days: Days(u32::from_le_bytes(bytes[4..8].try_into().unwrap())),
            millis: Millis(u32::from_le_bytes(bytes[8..12].try_into().unwrap())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn twelve_byte_little_endian_layout() {
        let duration = Duration::new(Months(3), Days(2), Millis(1200));
        let bytes = <[u8; 12]>::from(duration);
        assert_eq!(bytes, [3, 0, 0, 0, 2, 0, 0, 0, 0xB0, 0x04, 0, 0]);
        assert_eq!(Duration::from(bytes), duration);
    }
}
