//! Deserializers for loosely typed JSON feeds, where numbers arrive as strings
//! and flags as `"1"`/`"0"`.

pub mod lenient {
    use core::fmt;

    use serde::{
        de::{self, Visitor},
        Deserializer,
    };

    /// Accepts a string or any JSON number and returns it as a string.
    pub fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct StringOrNumber;

        impl<'de> Visitor<'de> for StringOrNumber {
            type Value = String;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a string or a number")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<String, E> {
                Ok(value.trim().to_owned())
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<String, E> {
                Ok(value.to_string())
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<String, E> {
                Ok(value.to_string())
            }

            fn visit_f64<E: de::Error>(self, value: f64) -> Result<String, E> {
                Ok(value.to_string())
            }
        }

        deserializer.deserialize_any(StringOrNumber)
    }

    /// Like [`string_or_number`], but `null` and booleans yield `None`.
    pub fn optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct OptionalString;

        impl<'de> Visitor<'de> for OptionalString {
            type Value = Option<String>;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a string, a number or null")
            }

            fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(None)
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(None)
            }

            fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
            where
                D: Deserializer<'de>,
            {
                deserializer.deserialize_any(OptionalString)
            }

            fn visit_bool<E: de::Error>(self, _value: bool) -> Result<Self::Value, E> {
                Ok(None)
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
                Ok(Some(value.trim().to_owned()))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
                Ok(Some(value.to_string()))
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
                Ok(Some(value.to_string()))
            }

            fn visit_f64<E: de::Error>(self, value: f64) -> Result<Self::Value, E> {
                Ok(Some(value.to_string()))
            }
        }

        deserializer.deserialize_any(OptionalString)
    }

    /// Reads a coordinate given as number or numeric string. Anything that is
    /// not a finite number (`null`, `""`, `"n/a"`, ...) becomes `None`, so a
    /// single bad record never fails the whole document.
    pub fn coordinate<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct Coordinate;

        impl<'de> Visitor<'de> for Coordinate {
            type Value = Option<f64>;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a coordinate as number or string")
            }

            fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(None)
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(None)
            }

            fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
            where
                D: Deserializer<'de>,
            {
                deserializer.deserialize_any(Coordinate)
            }

            fn visit_bool<E: de::Error>(self, _value: bool) -> Result<Self::Value, E> {
                Ok(None)
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
                Ok(value
                    .trim()
                    .replace(',', ".")
                    .parse::<f64>()
                    .ok()
                    .filter(|value| value.is_finite()))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
                Ok(Some(value as f64))
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
                Ok(Some(value as f64))
            }

            fn visit_f64<E: de::Error>(self, value: f64) -> Result<Self::Value, E> {
                Ok(Some(value).filter(|value| value.is_finite()))
            }
        }

        deserializer.deserialize_any(Coordinate)
    }

    /// Status flags arrive as `"1"`/`"0"`, `1`/`0` or booleans. Unknown values
    /// count as `false`.
    pub fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct Flag;

        impl<'de> Visitor<'de> for Flag {
            type Value = bool;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("\"1\", \"0\", a number or a boolean")
            }

            fn visit_none<E: de::Error>(self) -> Result<bool, E> {
                Ok(false)
            }

            fn visit_unit<E: de::Error>(self) -> Result<bool, E> {
                Ok(false)
            }

            fn visit_some<D>(self, deserializer: D) -> Result<bool, D::Error>
            where
                D: Deserializer<'de>,
            {
                deserializer.deserialize_any(Flag)
            }

            fn visit_bool<E: de::Error>(self, value: bool) -> Result<bool, E> {
                Ok(value)
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<bool, E> {
                Ok(matches!(
                    value.trim().to_lowercase().as_str(),
                    "1" | "true" | "activo"
                ))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<bool, E> {
                Ok(value == 1)
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<bool, E> {
                Ok(value == 1)
            }

            fn visit_f64<E: de::Error>(self, value: f64) -> Result<bool, E> {
                Ok(value == 1.0)
            }
        }

        deserializer.deserialize_any(Flag)
    }
}

pub mod date_time {
    use core::fmt;

    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{
        de::{self, Visitor},
        Deserializer,
    };

    const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

    /// Parses RFC 3339 timestamps and the offset-less variants feeds tend to
    /// send instead. Offset-less values are taken as UTC.
    pub fn parse_iso_like(value: &str) -> Option<DateTime<Utc>> {
        let value = value.trim();
        if let Ok(date_time) = DateTime::parse_from_rfc3339(value) {
            return Some(date_time.with_timezone(&Utc));
        }
        NAIVE_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
            .map(|naive| naive.and_utc())
    }

    /// Unparseable, missing or non-string timestamps become `None`.
    pub fn deserialize_iso_like_option<'de, D>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct IsoLike;

        impl<'de> Visitor<'de> for IsoLike {
            type Value = Option<DateTime<Utc>>;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("an ISO 8601 timestamp")
            }

            fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(None)
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(None)
            }

            fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
            where
                D: Deserializer<'de>,
            {
                deserializer.deserialize_any(IsoLike)
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
                Ok(parse_iso_like(value))
            }

            fn visit_bool<E: de::Error>(self, _value: bool) -> Result<Self::Value, E> {
                Ok(None)
            }

            fn visit_i64<E: de::Error>(self, _value: i64) -> Result<Self::Value, E> {
                Ok(None)
            }

            fn visit_u64<E: de::Error>(self, _value: u64) -> Result<Self::Value, E> {
                Ok(None)
            }

            fn visit_f64<E: de::Error>(self, _value: f64) -> Result<Self::Value, E> {
                Ok(None)
            }
        }

        deserializer.deserialize_any(IsoLike)
    }
}
