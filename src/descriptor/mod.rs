//! Declarative command descriptors
//!
//! Commands are declared as data, not discovered by reflection: a
//! [`CommandModule`] returns a table of [`CommandDescriptor`]s, each pairing
//! an id and parameter metadata with the handler that runs it. The compiler
//! turns these tables into executable [`crate::compiler::CompiledCommand`]s.

use async_trait::async_trait;
use std::sync::Arc;

use crate::convert::Converter;
use crate::dispatch::{BoundArgs, InvocationContext};
use crate::error::EngineResult;
use crate::response::Response;
use crate::value_objects::{ChannelType, CommandKind, ScopeId, TypeTag};

/// A handler entry point invoked once per matching event.
///
/// Returning `None` defers acknowledgement with default visibility.
/// Handlers raise [`crate::error::UserError`] deliberately; anything else
/// is treated as an internal fault at the dispatch boundary.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn invoke(
        &self,
        ctx: &InvocationContext<'_>,
        args: &BoundArgs,
    ) -> EngineResult<Option<Response>>;
}

/// A module contributing a table of command descriptors.
pub trait CommandModule: Send + Sync {
    /// Translation namespace for every descriptor in this module, unless a
    /// descriptor carries its own override.
    fn namespace(&self) -> Option<&str> {
        None
    }

    /// The descriptor table. Built fresh per call; compilation happens once.
    fn descriptors(&self) -> Vec<CommandDescriptor>;
}

/// Declarative metadata for one command entry point.
pub struct CommandDescriptor {
    /// Stable dotted id (`config.user.language`).
    pub id: String,
    /// Entry-point kind.
    pub kind: CommandKind,
    /// Visibility restriction; `None` is globally available.
    pub scope: Option<ScopeId>,
    /// Translation namespace override for this descriptor.
    pub namespace: Option<String>,
    /// Parameters in declared order.
    pub params: Vec<ParamSpec>,
    /// The handler bound to this entry point.
    pub handler: Arc<dyn CommandHandler>,
}

impl CommandDescriptor {
    /// A chat-input command.
    pub fn slash(id: impl Into<String>, handler: Arc<dyn CommandHandler>) -> Self {
        Self {
            id: id.into(),
            kind: CommandKind::Slash,
            scope: None,
            namespace: None,
            params: Vec::new(),
            handler,
        }
    }

    /// A user context-menu command.
    pub fn user_context(id: impl Into<String>, handler: Arc<dyn CommandHandler>) -> Self {
        Self {
            id: id.into(),
            kind: CommandKind::UserContext,
            scope: None,
            namespace: None,
            params: Vec::new(),
            handler,
        }
    }

    /// A message context-menu command.
    pub fn message_context(id: impl Into<String>, handler: Arc<dyn CommandHandler>) -> Self {
        Self {
            id: id.into(),
            kind: CommandKind::MessageContext,
            scope: None,
            namespace: None,
            params: Vec::new(),
            handler,
        }
    }

    /// Restrict visibility to one scope.
    pub fn in_scope(mut self, scope: ScopeId) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Override the translation namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Append a parameter.
    pub fn param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }
}

/// One declared parameter: contextual (populated from the event) or an
/// option (populated from caller input).
pub enum ParamSpec {
    /// Populated from ambient event context via a `None -> target` converter.
    Contextual { target: TypeTag },
    /// Populated from a named raw option value.
    Option(OptionSpec),
}

impl ParamSpec {
    /// A contextual parameter of the given target type.
    pub fn contextual(target: TypeTag) -> Self {
        Self::Contextual { target }
    }
}

/// Declaration of one option parameter.
pub struct OptionSpec {
    /// Option name as addressed in the event.
    pub name: String,
    /// Declared handler-facing type.
    pub target: TypeTag,
    /// Explicit raw kind override; inferred from `target` when absent.
    pub raw_kind: Option<TypeTag>,
    /// Whether the caller must supply this option.
    pub required: bool,
    /// Numeric range restriction.
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    /// String length restriction.
    pub min_length: Option<u32>,
    pub max_length: Option<u32>,
    /// Fixed choice values; display names come from translations.
    pub choices: Vec<String>,
    /// Permitted channel subtypes for channel-typed options.
    pub channel_types: Vec<ChannelType>,
    /// Autocomplete source id, when the option supports completion.
    pub autocomplete: Option<String>,
    /// Explicit converter override, bypassing registry resolution.
    pub converter: Option<Arc<dyn Converter>>,
}

impl OptionSpec {
    /// A required option.
    pub fn required(name: impl Into<String>, target: TypeTag) -> Self {
        Self::new(name, target, true)
    }

    /// An optional option; its absence binds the explicit absent marker.
    pub fn optional(name: impl Into<String>, target: TypeTag) -> Self {
        Self::new(name, target, false)
    }

    fn new(name: impl Into<String>, target: TypeTag, required: bool) -> Self {
        Self {
            name: name.into(),
            target,
            raw_kind: None,
            required,
            min_value: None,
            max_value: None,
            min_length: None,
            max_length: None,
            choices: Vec::new(),
            channel_types: Vec::new(),
            autocomplete: None,
            converter: None,
        }
    }

    /// Override the inferred raw kind.
    pub fn with_raw_kind(mut self, raw: TypeTag) -> Self {
        self.raw_kind = Some(raw);
        self
    }

    /// Restrict numeric values to an inclusive range.
    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.min_value = Some(min);
        self.max_value = Some(max);
        self
    }

    /// Restrict string length to an inclusive range.
    pub fn with_length(mut self, min: u32, max: u32) -> Self {
        self.min_length = Some(min);
        self.max_length = Some(max);
        self
    }

    /// Fix the permitted values to a choice set.
    pub fn with_choices<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices = values.into_iter().map(Into::into).collect();
        self
    }

    /// Narrow a channel option to specific channel subtypes.
    pub fn with_channel_types(mut self, types: Vec<ChannelType>) -> Self {
        self.channel_types = types;
        self
    }

    /// Attach an autocomplete source.
    pub fn with_autocomplete(mut self, source: impl Into<String>) -> Self {
        self.autocomplete = Some(source.into());
        self
    }

    /// Bypass registry resolution with an explicit converter.
    pub fn with_converter(mut self, converter: Arc<dyn Converter>) -> Self {
        self.converter = Some(converter);
        self
    }

    /// The effective raw kind: the explicit override or the inference from
    /// the target type.
    pub fn effective_raw_kind(&self) -> TypeTag {
        self.raw_kind.unwrap_or_else(|| self.target.raw_kind())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::Response;

    struct NoopHandler;

    #[async_trait]
    impl CommandHandler for NoopHandler {
        async fn invoke(
            &self,
            _ctx: &InvocationContext<'_>,
            _args: &BoundArgs,
        ) -> EngineResult<Option<Response>> {
            Ok(None)
        }
    }

    #[test]
    fn test_descriptor_builders() {
        let descriptor = CommandDescriptor::slash("config.user.language", Arc::new(NoopHandler))
            .with_namespace("bot")
            .param(ParamSpec::contextual(TypeTag::Scope))
            .param(ParamSpec::Option(
                OptionSpec::required("language", TypeTag::String)
                    .with_choices(["en-US", "de", "fr"]),
            ));

        assert_eq!(descriptor.id, "config.user.language");
        assert_eq!(descriptor.kind, CommandKind::Slash);
        assert_eq!(descriptor.namespace.as_deref(), Some("bot"));
        assert_eq!(descriptor.params.len(), 2);
    }

    #[test]
    fn test_effective_raw_kind() {
        let inferred = OptionSpec::required("when", TypeTag::Timestamp);
        assert_eq!(inferred.effective_raw_kind(), TypeTag::String);

        let explicit = OptionSpec::required("count", TypeTag::Number).with_raw_kind(TypeTag::Integer);
        assert_eq!(explicit.effective_raw_kind(), TypeTag::Integer);
    }
}
