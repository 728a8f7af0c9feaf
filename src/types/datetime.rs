//! Serde helper for the engine's wire date format.
//!
//! APIs in this family exchange timestamps as `2024-03-01 17:45` rather than
//! RFC 3339. Models opt in per field:
//!
//! ```
//! use chrono::{DateTime, Utc};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Release {
//!     #[serde(with = "integrations_http::types::datetime::wire_format")]
//!     published_at: DateTime<Utc>,
//! }
//! ```

/// The wire date format, minute precision.
pub const WIRE_DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// `#[serde(with = ...)]` module for [`WIRE_DATE_FORMAT`] timestamps.
pub mod wire_format {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};

    use super::WIRE_DATE_FORMAT;

    /// Serialize a UTC instant in the wire format.
    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.format(WIRE_DATE_FORMAT).to_string())
    }

    /// Deserialize a UTC instant from the wire format.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&text, WIRE_DATE_FORMAT)
            .map(|naive| naive.and_utc())
            .map_err(serde::de::Error::custom)
    }
}
