//! Validated identifier types used throughout the Threadsmith crates.
//!
//! Two families live here:
//!
//! 1. **Locally minted identifiers** (`OwnerKey`, `SessionId`, `FunctionName`)
//!    follow parse-don't-validate: `parse()` returns a `Result` and the inner
//!    string is guaranteed to satisfy the shared validation rules. Each type
//!    is a distinct newtype so an `OwnerKey` can never be passed where a
//!    `FunctionName` is expected.
//! 2. **Remote-issued tokens** (`ThreadId`, `RunId`, `AssistantId`) are opaque
//!    values handed out by the Run Service. They carry no validation — the
//!    service owns their format — but stay newtyped for the same mix-up
//!    protection.
//!
//! # Validation Rules
//!
//! - Non-empty, maximum 128 characters
//! - No leading or trailing whitespace
//! - Only alphanumeric characters, hyphens (`-`), underscores (`_`), and dots (`.`)
//! - No path traversal sequences (`../`, `./`)
//!
//! The traversal rule is load-bearing for `FunctionName`: the name doubles as
//! a file stem inside the functions directory, so a name like `../etc/passwd`
//! must never validate.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum length for validated identifiers.
pub const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Error type for identifier validation failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidIdentifier {
    /// The identifier string is empty.
    #[error("identifier cannot be empty")]
    Empty,
    /// The identifier has leading or trailing whitespace.
    #[error("identifier cannot have leading or trailing whitespace")]
    SurroundingWhitespace,
    /// The identifier contains characters outside the allowed set.
    #[error(
        "identifier can only contain alphanumeric characters, hyphens, underscores, and dots"
    )]
    InvalidCharacters,
    /// The identifier exceeds the maximum length.
    #[error("identifier too long ({length} chars, max {max})")]
    TooLong { length: usize, max: usize },
    /// The identifier contains a path traversal sequence.
    #[error("identifier cannot contain path traversal sequences")]
    PathTraversal,
}

fn validate(id: &str) -> Result<&str, InvalidIdentifier> {
    if id.is_empty() {
        return Err(InvalidIdentifier::Empty);
    }
    if id != id.trim() {
        return Err(InvalidIdentifier::SurroundingWhitespace);
    }
    if id.len() > MAX_IDENTIFIER_LENGTH {
        return Err(InvalidIdentifier::TooLong {
            length: id.len(),
            max: MAX_IDENTIFIER_LENGTH,
        });
    }
    if id.starts_with("./") || id.contains("..") {
        return Err(InvalidIdentifier::PathTraversal);
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(InvalidIdentifier::InvalidCharacters);
    }
    Ok(id)
}

macro_rules! validated_identifier {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Parse and validate from a string.
            pub fn parse(id: impl AsRef<str>) -> Result<Self, InvalidIdentifier> {
                validate(id.as_ref()).map(|s| Self(s.to_string()))
            }

            /// Get the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Create without validation. Only for inputs already known to be
            /// valid; user input must go through `parse()`.
            #[doc(hidden)]
            pub fn new_unchecked(id: impl Into<String>) -> Self {
                Self(id.into())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = InvalidIdentifier;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = InvalidIdentifier;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                Self::parse(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

macro_rules! opaque_token {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a service-issued token.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the token as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

validated_identifier! {
    /// Caller-supplied key that scopes both the remote assistant definition
    /// and the local function registry. All registry and assistant lookups
    /// are partitioned by this key; there is no cross-owner visibility.
    OwnerKey
}

validated_identifier! {
    /// Opaque token identifying one conversational session. A session maps
    /// to exactly one thread, created lazily and kept for the process
    /// lifetime.
    SessionId
}

validated_identifier! {
    /// Name of a callable function, unique per owner. Doubles as the file
    /// stem of the function's source module, which is why traversal
    /// sequences are rejected at parse time.
    FunctionName
}

opaque_token! {
    /// Remote-issued identifier of a conversation thread.
    ThreadId
}

opaque_token! {
    /// Remote-issued identifier of a single run.
    RunId
}

opaque_token! {
    /// Remote-issued identifier of an assistant definition.
    AssistantId
}
