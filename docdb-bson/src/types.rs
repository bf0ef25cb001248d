//! Extended value types carried inside documents.

use std::fmt;

/// UTC datetime as milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DateTime(i64);

impl DateTime {
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    pub fn now() -> Self {
        Self(chrono::Utc::now().timestamp_millis())
    }

    pub const fn timestamp_millis(&self) -> i64 {
        self.0
    }

    /// Converts to a chrono datetime. Returns `None` when the value is
    /// outside chrono's representable range.
    pub fn to_chrono(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        chrono::DateTime::from_timestamp_millis(self.0)
    }
}

impl From<chrono::DateTime<chrono::Utc>> for DateTime {
    fn from(value: chrono::DateTime<chrono::Utc>) -> Self {
        Self(value.timestamp_millis())
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_chrono() {
            Some(dt) => write!(
                f,
                "{}",
                dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
            ),
            None => write!(f, "DateTime({})", self.0),
        }
    }
}

/// Binary subtypes with a defined meaning.
pub mod subtype {
    pub const GENERIC: u8 = 0x00;
    pub const FUNCTION: u8 = 0x01;
    pub const BINARY_OLD: u8 = 0x02;
    pub const UUID_OLD: u8 = 0x03;
    pub const UUID: u8 = 0x04;
    pub const MD5: u8 = 0x05;
    pub const ENCRYPTED: u8 = 0x06;
    pub const USER_DEFINED: u8 = 0x80;
}

/// Binary blob tagged with a subtype.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Binary {
    pub subtype: u8,
    pub bytes: Vec<u8>,
}

impl Binary {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            subtype: subtype::GENERIC,
            bytes: bytes.into(),
        }
    }

    pub fn with_subtype(mut self, subtype: u8) -> Self {
        self.subtype = subtype;
        self
    }

    pub fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self {
            subtype: subtype::UUID,
            bytes: uuid.as_bytes().to_vec(),
        }
    }

    /// Interprets the blob as a UUID when it has the UUID subtype.
    pub fn to_uuid(&self) -> Option<uuid::Uuid> {
        if self.subtype != subtype::UUID {
            return None;
        }
        uuid::Uuid::from_slice(&self.bytes).ok()
    }
}

/// Internal replication timestamp: seconds plus an ordinal within the second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timestamp {
    pub time: u32,
    pub increment: u32,
}

/// Regular expression with its option flags.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Regex {
    pub pattern: String,
    pub options: String,
}

impl Regex {
    /// Creates a regex, sorting the option characters as the wire format
    /// requires.
    pub fn new(pattern: impl Into<String>, options: impl AsRef<str>) -> Self {
        let mut chars: Vec<char> = options.as_ref().chars().collect();
        chars.sort_unstable();
        Self {
            pattern: pattern.into(),
            options: chars.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_datetime_chrono_conversion() {
        let dt = DateTime::from_millis(1_600_000_000_123);
        let chrono_dt = dt.to_chrono().unwrap();
        assert_eq!(DateTime::from(chrono_dt), dt);
        assert_eq!(dt.to_string(), "2020-09-13T12:26:40.123Z");
    }

    #[test]
    fn test_datetime_out_of_range_display() {
        let dt = DateTime::from_millis(i64::MAX);
        assert!(dt.to_chrono().is_none());
        assert!(dt.to_string().starts_with("DateTime("));
    }

    #[test]
    fn test_binary_uuid() {
        let id = uuid::Uuid::new_v4();
        let bin = Binary::from_uuid(id);
        assert_eq!(bin.subtype, subtype::UUID);
        assert_eq!(bin.to_uuid(), Some(id));

        let generic = Binary::new(id.as_bytes().to_vec());
        assert_eq!(generic.to_uuid(), None);
    }

    #[test]
    fn test_regex_options_sorted() {
        let re = Regex::new("^a.*", "xim");
        assert_eq!(re.options, "imx");
    }
}
