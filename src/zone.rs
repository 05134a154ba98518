use crate::error::{Error, Result};
use chrono::{DateTime, FixedOffset, Local, Utc};
use chrono_tz::Tz;
use std::{fmt, str::FromStr};

/// Time zone used to render certificate timestamps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Zone {
    /// The system's local time zone
    #[default]
    Local,
    /// An IANA time zone such as `Asia/Tokyo` or `UTC`
    Named(Tz),
}

impl Zone {
    /// Convert a UTC instant into this zone, keeping the offset
    #[must_use]
    pub fn convert(&self, instant: DateTime<Utc>) -> DateTime<FixedOffset> {
        match self {
            Self::Local => instant.with_timezone(&Local).fixed_offset(),
            Self::Named(tz) => instant.with_timezone(tz).fixed_offset(),
        }
    }
}

impl FromStr for Zone {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim();
        if name.is_empty() {
            return Err(Error::InvalidTimezone(s.to_string()));
        }
        if name == "Local" {
            return Ok(Self::Local);
        }
        name.parse::<Tz>()
            .map(Self::Named)
            .map_err(|_| Error::InvalidTimezone(s.to_string()))
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("Local"),
            Self::Named(tz) => f.write_str(tz.name()),
        }
    }
}
