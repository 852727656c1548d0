use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::{fmt, str::FromStr};

pub mod flickr;
pub mod lastfm;
pub mod pinboard;
pub mod twitter;

/// Tags whose name starts with this are kept out of public listings.
pub const PRIVATE_TAG_MARKER: char = '.';

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Service {
    Pinboard,
    Flickr,
    Lastfm,
    Twitter,
}

impl Service {
    pub const ALL: [Service; 4] = [
        Service::Pinboard,
        Service::Flickr,
        Service::Lastfm,
        Service::Twitter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Service::Pinboard => "pinboard",
            Service::Flickr => "flickr",
            Service::Lastfm => "lastfm",
            Service::Twitter => "twitter",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Service {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Service::ALL
            .into_iter()
            .find(|service| service.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| crate::Error::usage(format!("unknown service '{s}'")))
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq, FromRow)]
pub struct Account {
    pub id: i64,
    pub service: Service,
    pub username: String,
    /// Flickr NSID or Twitter numeric user id.
    pub remote_id: Option<String>,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub is_active: bool,
    pub time_created: DateTime<Utc>,
    pub time_modified: DateTime<Utc>,
}

impl Account {
    pub fn has_credentials(&self) -> bool {
        self.api_key.as_deref().map_or(false, |k| !k.trim().is_empty())
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.username)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq, FromRow)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

impl Tag {
    pub fn is_private(&self) -> bool {
        is_private_tag(&self.name)
    }
}

pub fn is_private_tag(name: &str) -> bool {
    name.starts_with(PRIVATE_TAG_MARKER)
}

/// Lowercase, alphanumerics kept, everything else collapsed to single dashes.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            slug.push(c);
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_names() {
        for service in Service::ALL {
            assert_eq!(service.as_str().parse::<Service>().unwrap(), service);
        }
        assert_eq!("LastFM".parse::<Service>().unwrap(), Service::Lastfm);
        assert!("myspace".parse::<Service>().unwrap_err().is_usage());
    }

    #[test]
    fn private_tags() {
        assert!(is_private_tag(".secret"));
        assert!(!is_private_tag("rust"));
        assert!(!is_private_tag("dot.net"));
    }

    #[test]
    fn slugs() {
        assert_eq!(slugify("Rust Lang"), "rust-lang");
        assert_eq!(slugify(".private"), "private");
        assert_eq!(slugify("C++ / tips!"), "c-tips");
        assert_eq!(slugify("Ünïcode"), "ünïcode");
    }
}
