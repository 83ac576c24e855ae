//! Value objects shared across the command engine
//!
//! These are the small immutable types the rest of the crate is built from:
//! the tagged type system driving converter resolution, the runtime values
//! carried along converter edges, platform entity references, and the parsed
//! command id hierarchy.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

use crate::error::CompileError;

/// Tag identifying a convertible domain type.
///
/// The tag set is closed: widening between tags is declared in
/// [`TypeTag::accepts`] rather than derived from runtime type information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeTag {
    /// Sentinel for "no external input" (contextual parameters).
    None,
    /// UTF-8 text
    String,
    /// Whole number
    Integer,
    /// Floating-point number
    Number,
    /// True/false flag
    Boolean,
    /// Platform user
    User,
    /// User resolved within a scope
    Member,
    /// Platform channel
    Channel,
    /// Platform role
    Role,
    /// User, member, or role
    Mentionable,
    /// Uploaded attachment
    Attachment,
    /// Span of time
    Duration,
    /// Point in time
    Timestamp,
    /// Originating scope instance
    Scope,
    /// Caller locale code
    Locale,
}

impl TypeTag {
    /// Whether a value tagged `other` is acceptable where `self` is expected.
    ///
    /// This is the explicit subtype table: a mentionable slot accepts users,
    /// members, and roles; a user slot accepts members; a floating-point slot
    /// accepts integers. Everything else requires an exact match.
    pub fn accepts(self, other: TypeTag) -> bool {
        if self == other {
            return true;
        }
        matches!(
            (self, other),
            (TypeTag::Mentionable, TypeTag::User)
                | (TypeTag::Mentionable, TypeTag::Member)
                | (TypeTag::Mentionable, TypeTag::Role)
                | (TypeTag::User, TypeTag::Member)
                | (TypeTag::Number, TypeTag::Integer)
        )
    }

    /// The canonical platform raw kind carrying values of this type.
    ///
    /// Derived kinds arrive over the wire as strings; context-only kinds have
    /// no raw representation and map to the [`TypeTag::None`] sentinel.
    pub fn raw_kind(self) -> TypeTag {
        match self {
            TypeTag::Duration | TypeTag::Timestamp | TypeTag::Locale => TypeTag::String,
            TypeTag::Member => TypeTag::User,
            TypeTag::Scope | TypeTag::None => TypeTag::None,
            other => other,
        }
    }
}

/// Reference to a platform user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: Uuid,
    pub name: String,
}

/// Reference to a platform channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelRef {
    pub id: Uuid,
    pub name: String,
    pub channel_type: ChannelType,
}

/// Reference to a platform role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleRef {
    pub id: Uuid,
    pub name: String,
}

/// Reference to an uploaded attachment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentRef {
    pub id: Uuid,
    pub filename: String,
    pub size_bytes: u64,
    pub url: String,
}

/// Channel subtypes used to narrow channel-typed options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelType {
    Text,
    Voice,
    Category,
    Thread,
    Forum,
}

/// Identifier of an external scope instance (one guild/server).
///
/// A command without a scope is globally available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeId(pub Uuid);

impl ScopeId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of a declared command entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandKind {
    /// Chat-input command addressed by name.
    Slash,
    /// Context-menu entry on a user.
    UserContext,
    /// Context-menu entry on a message.
    MessageContext,
}

impl CommandKind {
    /// Context-menu kinds carry a display name but no description or options.
    pub fn is_context(self) -> bool {
        matches!(self, CommandKind::UserContext | CommandKind::MessageContext)
    }
}

/// A runtime value flowing along converter edges.
///
/// One variant per [`TypeTag`], plus [`Value::Absent`] marking an optional
/// option the caller did not supply.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Explicit absent marker for unset optional options.
    Absent,
    /// Sentinel input handed to contextual converters.
    None,
    String(String),
    Integer(i64),
    Number(f64),
    Boolean(bool),
    User(UserRef),
    Channel(ChannelRef),
    Role(RoleRef),
    Attachment(AttachmentRef),
    Duration(Duration),
    Timestamp(DateTime<Utc>),
    Scope(ScopeId),
    Locale(String),
}

impl Value {
    /// The tag of this value.
    pub fn tag(&self) -> TypeTag {
        match self {
            Value::Absent | Value::None => TypeTag::None,
            Value::String(_) => TypeTag::String,
            Value::Integer(_) => TypeTag::Integer,
            Value::Number(_) => TypeTag::Number,
            Value::Boolean(_) => TypeTag::Boolean,
            Value::User(_) => TypeTag::User,
            Value::Channel(_) => TypeTag::Channel,
            Value::Role(_) => TypeTag::Role,
            Value::Attachment(_) => TypeTag::Attachment,
            Value::Duration(_) => TypeTag::Duration,
            Value::Timestamp(_) => TypeTag::Timestamp,
            Value::Scope(_) => TypeTag::Scope,
            Value::Locale(_) => TypeTag::Locale,
        }
    }

    /// True for the absent marker.
    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Locale(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            Value::Duration(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Timestamp(t) => Some(*t),
            _ => None,
        }
    }
}

/// A fixed choice offered for an option, with localized display names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandChoice {
    /// Stable value handed to the handler.
    pub value: String,
    /// Display name at the default locale.
    pub name: String,
    /// Per-locale display names.
    pub name_localizations: HashMap<String, String>,
}

/// Parsed dotted command id.
///
/// One part is a standalone root command, two parts a direct subcommand,
/// three parts a subcommand inside an implicitly-created group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommandPath {
    pub root: String,
    pub group: Option<String>,
    pub leaf: Option<String>,
}

impl CommandPath {
    /// Parse a dotted id into its hierarchy.
    pub fn parse(id: &str) -> Result<Self, CompileError> {
        let malformed = |reason: &str| CompileError::MalformedId {
            id: id.to_string(),
            reason: reason.to_string(),
        };

        let parts: Vec<&str> = id.split('.').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(malformed("empty path segment"));
        }
        for part in &parts {
            let valid = part
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
            if !valid {
                return Err(malformed("segments must be lowercase alphanumeric, '-' or '_'"));
            }
        }

        match parts.as_slice() {
            [root] => Ok(Self {
                root: root.to_string(),
                group: None,
                leaf: None,
            }),
            [root, leaf] => Ok(Self {
                root: root.to_string(),
                group: None,
                leaf: Some(leaf.to_string()),
            }),
            [root, group, leaf] => Ok(Self {
                root: root.to_string(),
                group: Some(group.to_string()),
                leaf: Some(leaf.to_string()),
            }),
            _ => Err(malformed("at most three segments (root.group.leaf) are allowed")),
        }
    }

    /// The full dotted id.
    pub fn full_name(&self) -> String {
        match (&self.group, &self.leaf) {
            (None, None) => self.root.clone(),
            (None, Some(leaf)) => format!("{}.{}", self.root, leaf),
            (Some(group), Some(leaf)) => format!("{}.{}.{}", self.root, group, leaf),
            // group without leaf is unreachable via parse
            (Some(group), None) => format!("{}.{}", self.root, group),
        }
    }

    /// Whether this id names a standalone root command.
    pub fn is_root(&self) -> bool {
        self.leaf.is_none()
    }

    /// The final segment (the addressable command name).
    pub fn leaf_name(&self) -> &str {
        self.leaf.as_deref().unwrap_or(&self.root)
    }
}

impl fmt::Display for CommandPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_name())
    }
}
