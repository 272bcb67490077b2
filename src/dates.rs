//! `YYYY-MM-DD` serde for calendar dates.

use serde::{de::Error as _, ser::Error as _, Deserialize, Deserializer, Serializer};
use time::{format_description::FormatItem, macros::format_description, Date};

const FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

pub fn parse(text: &str) -> Result<Date, time::error::Parse> {
    Date::parse(text.trim(), FORMAT)
}

pub fn serialize<S: Serializer>(date: &Date, s: S) -> Result<S::Ok, S::Error> {
    let text = date.format(FORMAT).map_err(S::Error::custom)?;
    s.serialize_str(&text)
}

pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Date, D::Error> {
    let text = String::deserialize(d)?;
    parse(&text).map_err(D::Error::custom)
}

pub mod option {
    use serde::{de::Error as _, Deserialize, Deserializer};
    use time::Date;

    use super::parse;

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Date>, D::Error> {
        match Option::<String>::deserialize(d)? {
            Some(text) if !text.trim().is_empty() => parse(&text).map(Some).map_err(D::Error::custom),
            _ => Ok(None),
        }
    }
}
