//! Utilities dealing with error handling in this crate.

use failure::Fail;

/// Errors produced by this crate.
#[derive(Debug, Fail)]
pub enum Error {
    /// Errors originating from calls to `std::io::*`.
    #[fail(display = "IO Error - {}", _0)]
    IO(#[cause] std::io::Error),
    /// Errors originating from calls to `regex::*`.
    #[fail(display = "Regex Error - {}", _0)]
    Regex(#[cause] regex::Error),
    /// Errors parsing Glob patterns.
    #[fail(display = "Glob Error - {}", _0)]
    GlobPattern(#[cause] glob::PatternError),
    /// Errors decoding JSON event or metric files.
    #[fail(display = "JSON Error - {}", _0)]
    Json(#[cause] serde_json::Error),
    /// Errors caused by a line of an event file that fits neither event dialect.
    #[fail(display = "Parse Error - {}", _0)]
    ParseEventLine(#[cause] pest::error::Error<crate::pmu::Rule>),
    /// A malformed line or record in a definition file.
    #[fail(display = "Format Error - {}: {}", path, content)]
    Format {
        /// File the content was read from.
        path: String,
        /// Offending line or record.
        content: String,
    },
    /// A definition file or directory that is missing or cannot be read.
    #[fail(display = "Resource Error - {}: {}", path, reason)]
    Resource {
        /// Path of the file or directory.
        path: String,
        /// Why it could not be used.
        reason: String,
    },
    /// Unknown microarchitecture, vendor, device type or metric name.
    #[fail(display = "Lookup Error - {}", _0)]
    Lookup(String),
    /// An `if` in a metric formula without a matching `else`.
    #[fail(display = "Conditional Syntax Error - if without matching else: {}", _0)]
    ConditionalSyntax(String),
}

impl Error {
    /// Create a `Resource` error for `path`.
    pub(crate) fn resource<P, R>(path: P, reason: R) -> Self
    where
        P: AsRef<std::path::Path>,
        R: std::fmt::Display,
    {
        Error::Resource {
            path: path.as_ref().display().to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a `Format` error for `content` read from `path`.
    pub(crate) fn format<P: AsRef<std::path::Path>>(path: P, content: &str) -> Self {
        Error::Format {
            path: path.as_ref().display().to_string(),
            content: String::from(content),
        }
    }
}

macro_rules! error_from {
    ($et: ty => $cet: expr) => {
        impl From<$et> for Error {
            #[inline]
            fn from(err: $et) -> Self {
                $cet(err)
            }
        }
    };
}

error_from!(std::io::Error => Error::IO);
error_from!(regex::Error => Error::Regex);
error_from!(glob::PatternError => Error::GlobPattern);
error_from!(serde_json::Error => Error::Json);
error_from!(pest::error::Error<crate::pmu::Rule> => Error::ParseEventLine);

/// Result type used in this crate.
pub type Result<T> = std::result::Result<T, Error>;
