use crate::models::tado::{HomeId, ZoneId};
use core::fmt;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from filling a resource path template such as `homes/{home}/zones/{zone}/state`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// Template references `{home}` but the session has not resolved a home yet
    MissingHome,
    /// Template references `{zone}` but no zone was supplied
    MissingZone,
    /// Placeholder other than `{home}` or `{zone}`
    UnknownPlaceholder(String),
    /// `{` without a closing `}`
    Unterminated,
}

impl Display for PathError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            PathError::MissingHome => write!(f, "path needs a home id but none is resolved"),
            PathError::MissingZone => write!(f, "path needs a zone id but none was given"),
            PathError::UnknownPlaceholder(p) => write!(f, "unknown path placeholder {{{}}}", p),
            PathError::Unterminated => write!(f, "unterminated placeholder in path template"),
        }
    }
}

impl Error for PathError {}

/// Substitute `{home}` and `{zone}` in `template`.
pub fn expand_path(template: &str, home: Option<HomeId>, zone: Option<ZoneId>) -> Result<String, PathError> {
    let mut out = String::with_capacity(template.len() + 8);
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let close = after.find('}').ok_or(PathError::Unterminated)?;
        match &after[..close] {
            "home" => out.push_str(&home.ok_or(PathError::MissingHome)?.to_string()),
            "zone" => out.push_str(&zone.ok_or(PathError::MissingZone)?.to_string()),
            other => return Err(PathError::UnknownPlaceholder(other.to_string())),
        }
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Decode a passthrough payload into a typed view, keeping the failing field path.
pub fn decode<T: DeserializeOwned>(value: Value) -> Result<T, serde_path_to_error::Error<serde_json::Error>> {
    serde_path_to_error::deserialize(value)
}

/// Serialize a serde-backed enum into its string name (e.g. SCREAMING_SNAKE_CASE).
pub fn serde_enum_name<T: Serialize>(val: &T) -> Option<String> {
    serde_json::to_value(val).ok()?.as_str().map(|s| s.to_string())
}
