//! Repository and archive locations.
//!
//! A location has the form `[[user@]host:]path[::archive]`. A bare path names a
//! local repository; `host:` makes it remote and `::archive` selects one
//! archive inside the repository.

use crate::error::{Error, Result};
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Whether a location argument must, must not, or may name an archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArchiveRequirement {
    /// The location must end in `::archive`.
    Required,
    /// The location must not name an archive.
    Forbidden,
    /// Either form is accepted.
    #[default]
    Any,
}

/// A parsed location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Location {
    user: Option<String>,
    host: Option<String>,
    path: String,
    archive: Option<String>,
}

fn location_regex() -> &'static Regex {
    static LOCATION_RE: OnceLock<Regex> = OnceLock::new();
    LOCATION_RE.get_or_init(|| {
        Regex::new(
            r"^((?:(?P<user>[^@]+)@)?(?P<host>[^:]+):)?(?P<path>[^:]*)(?:::(?P<archive>[^:]+))?$",
        )
        .expect("valid regex")
    })
}

impl Location {
    /// Parse a location string.
    ///
    /// Fails when the text does not follow the grammar, or when it names
    /// neither a host nor a path.
    pub fn parse(text: &str) -> Result<Self> {
        let caps = location_regex()
            .captures(text)
            .ok_or_else(|| Error::invalid_location(text))?;
        let group = |name: &str| caps.name(name).map(|m| m.as_str().to_string());

        let location = Self {
            user: group("user"),
            host: group("host"),
            path: group("path").unwrap_or_default(),
            archive: group("archive"),
        };

        if location.host.is_none() && location.path.is_empty() {
            return Err(Error::invalid_location(text));
        }

        log::debug!("parsed location {:?} from {:?}", location, text);
        Ok(location)
    }

    /// Parse a location and check whether it names an archive.
    pub fn validate(text: &str, requirement: ArchiveRequirement) -> Result<Self> {
        let location = Self::parse(text)?;
        match requirement {
            ArchiveRequirement::Required if location.archive.is_none() => {
                Err(Error::archive_required(text))
            }
            ArchiveRequirement::Forbidden if location.archive.is_some() => {
                Err(Error::archive_forbidden(text))
            }
            _ => Ok(location),
        }
    }

    /// Remote user, if given.
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// Remote host, if given.
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// Repository path. May be empty for remote locations.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Archive name, if given.
    pub fn archive(&self) -> Option<&str> {
        self.archive.as_deref()
    }

    /// True when the repository lives on another host.
    pub fn is_remote(&self) -> bool {
        self.host.is_some()
    }
}

/// Canonical form.
///
/// The host separator is written as `::` and the archive separator as `:`,
/// the reverse of what [`Location::parse`] accepts. Consumers rely on this
/// exact text, so it must not be normalised.
impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(user) = &self.user {
            write!(f, "{}@", user)?;
        }
        if let Some(host) = &self.host {
            write!(f, "{}::", host)?;
        }
        f.write_str(&self.path)?;
        if let Some(archive) = &self.archive {
            write!(f, ":{}", archive)?;
        }
        Ok(())
    }
}

impl FromStr for Location {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
