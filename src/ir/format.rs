use std::net::{Ipv4Addr, Ipv6Addr};

use chrono::{DateTime, NaiveDate, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;

/// Named string formats recognized as built-in type names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Email,
    Url,
    Uuid,
    Date,
    DateTime,
    Time,
    Ipv4,
    Ipv6,
    Hostname,
    Slug,
    Alphanum,
    HexColor,
    ObjectId,
}

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9](?:[A-Za-z0-9\-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9\-]*[A-Za-z0-9])?)+$").unwrap()
});
static URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?i:https?|ftp)://[^\s/?#]+(?:[/?#][^\s]*)?$").unwrap()
});
static UUID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$").unwrap()
});
static HOSTNAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[A-Za-z0-9](?:[A-Za-z0-9\-]{0,61}[A-Za-z0-9])?)(?:\.[A-Za-z0-9](?:[A-Za-z0-9\-]{0,61}[A-Za-z0-9])?)*$").unwrap()
});
static SLUG: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap());
static ALPHANUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9]+$").unwrap());
static HEX_COLOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").unwrap());
static OBJECT_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9a-fA-F]{24}$").unwrap());

impl Format {
    pub fn name(&self) -> &'static str {
        match self {
            Format::Email => "email",
            Format::Url => "url",
            Format::Uuid => "uuid",
            Format::Date => "date",
            Format::DateTime => "datetime",
            Format::Time => "time",
            Format::Ipv4 => "ipv4",
            Format::Ipv6 => "ipv6",
            Format::Hostname => "hostname",
            Format::Slug => "slug",
            Format::Alphanum => "alphanum",
            Format::HexColor => "hexColor",
            Format::ObjectId => "objectId",
        }
    }

    /// JSON Schema `format` keyword, where one exists.
    pub fn json_schema_format(&self) -> Option<&'static str> {
        match self {
            Format::Email => Some("email"),
            Format::Url => Some("uri"),
            Format::Uuid => Some("uuid"),
            Format::Date => Some("date"),
            Format::DateTime => Some("date-time"),
            Format::Time => Some("time"),
            Format::Ipv4 => Some("ipv4"),
            Format::Ipv6 => Some("ipv6"),
            Format::Hostname => Some("hostname"),
            _ => None,
        }
    }

    /// Regex equivalent for formats JSON Schema has no keyword for.
    pub fn json_schema_pattern(&self) -> Option<&'static str> {
        match self {
            Format::Slug => Some(SLUG.as_str()),
            Format::Alphanum => Some(ALPHANUM.as_str()),
            Format::HexColor => Some(HEX_COLOR.as_str()),
            Format::ObjectId => Some(OBJECT_ID.as_str()),
            _ => None,
        }
    }

    pub fn check(&self, s: &str) -> bool {
        match self {
            Format::Email => EMAIL.is_match(s),
            Format::Url => URL.is_match(s),
            Format::Uuid => UUID.is_match(s),
            Format::Date => NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok(),
            Format::DateTime => DateTime::parse_from_rfc3339(s).is_ok(),
            Format::Time => {
                NaiveTime::parse_from_str(s, "%H:%M:%S").is_ok()
                    || NaiveTime::parse_from_str(s, "%H:%M").is_ok()
            }
            Format::Ipv4 => s.parse::<Ipv4Addr>().is_ok(),
            Format::Ipv6 => s.parse::<Ipv6Addr>().is_ok(),
            Format::Hostname => s.len() <= 253 && HOSTNAME.is_match(s),
            Format::Slug => SLUG.is_match(s),
            Format::Alphanum => ALPHANUM.is_match(s),
            Format::HexColor => HEX_COLOR.is_match(s),
            Format::ObjectId => OBJECT_ID.is_match(s),
        }
    }
}
