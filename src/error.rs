//! Error taxonomy for the command engine
//!
//! Three layers of failure exist: compile-time descriptor problems
//! ([`CompileError`]), deliberate user-facing failures ([`UserError`]), and
//! everything else ([`EngineError::Internal`]). The dispatcher is the single
//! recovery boundary; converters and handlers either raise a `UserError`
//! deliberately or let an internal error propagate unchecked.

use thiserror::Error;

use crate::value_objects::TypeTag;

/// Errors raised while compiling a command descriptor.
///
/// A compile error aborts only the offending entry point; sibling
/// descriptors in the same module continue compiling.
#[derive(Debug, Clone, Error)]
pub enum CompileError {
    /// Required display text was not found in the translation provider.
    #[error("missing translation '{key}' for locale '{locale}'")]
    MissingTranslation { key: String, locale: String },

    /// No converter path exists between the raw input and the declared
    /// parameter type.
    #[error("no converter from {from:?} to {to:?} for parameter '{param}' of command '{command}'")]
    UnresolvedConverter {
        command: String,
        param: String,
        from: TypeTag,
        to: TypeTag,
    },

    /// The dotted command id does not form a valid hierarchy.
    #[error("malformed command id '{id}': {reason}")]
    MalformedId { id: String, reason: String },

    /// Descriptor metadata is inconsistent with its declared kind.
    #[error("invalid descriptor '{id}': {reason}")]
    InvalidDescriptor { id: String, reason: String },

    /// A command with the same `(scope, full name)` key is already present.
    #[error("command '{full_name}' is already registered ({scope})")]
    DuplicateCommand { full_name: String, scope: String },

    /// A root id is used both as a standalone command and as a parent of
    /// subcommands or groups.
    #[error("root '{root}' is declared both as a standalone command and as a parent of subcommands")]
    RootConflict { root: String },
}

/// A deliberate, user-facing failure raised by a converter or handler.
///
/// User errors are replied to the caller and never logged as system faults.
/// When a translation key is present the dispatcher renders it in the
/// caller's locale, falling back to the plain text.
#[derive(Debug, Clone, Error)]
#[error("{text}")]
pub struct UserError {
    key: Option<String>,
    text: String,
}

impl UserError {
    /// Create a user error with literal text.
    pub fn message(text: impl Into<String>) -> Self {
        Self {
            key: None,
            text: text.into(),
        }
    }

    /// Create a localizable user error with a fallback text.
    pub fn localized(key: impl Into<String>, fallback: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            text: fallback.into(),
        }
    }

    /// Translation key, when this error is localizable.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Fallback text shown when no translation is available.
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Unified error type crossing the engine's public seams.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Descriptor compilation or registration failure.
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// Deliberate user-facing failure.
    #[error(transparent)]
    User(#[from] UserError),

    /// Unexpected failure inside a converter or handler.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl EngineError {
    /// True when this error should be replied to the caller as-is.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, EngineError::User(_))
    }
}

/// Convenience alias for results with [`EngineError`].
pub type EngineResult<T> = std::result::Result<T, EngineError>;
