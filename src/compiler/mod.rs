//! Descriptor compilation
//!
//! The compiler turns declarative [`CommandDescriptor`]s into immutable
//! [`CompiledCommand`]s: it validates the id hierarchy, resolves localized
//! display text through the translation provider, and binds one converter
//! per parameter via the registry (or an explicit override). Compilation of
//! a module isolates failures — one bad descriptor is logged and skipped
//! while its siblings compile.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, warn};

use crate::convert::{Converter, ConverterRegistry};
use crate::descriptor::{CommandDescriptor, CommandHandler, CommandModule, OptionSpec, ParamSpec};
use crate::error::CompileError;
use crate::i18n::{LocaleSettings, Translation};
use crate::value_objects::{
    ChannelType, CommandChoice, CommandKind, CommandPath, ScopeId, TypeTag,
};

/// A fully bound option parameter.
pub struct OptionBinding {
    pub name: String,
    /// Raw kind the platform delivers the value as.
    pub raw_kind: TypeTag,
    /// Handler-facing type produced by the converter.
    pub target: TypeTag,
    pub required: bool,
    /// Converter from raw kind to target, possibly a chain.
    pub converter: Arc<dyn Converter>,
    pub choices: Vec<CommandChoice>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub min_length: Option<u32>,
    pub max_length: Option<u32>,
    pub channel_types: Vec<ChannelType>,
    pub autocomplete: Option<String>,
}

/// One bound parameter in declared order.
pub enum ParamBinding {
    /// Populated from ambient event context.
    Contextual {
        target: TypeTag,
        converter: Arc<dyn Converter>,
    },
    /// Populated from a named raw option value.
    Option(OptionBinding),
}

/// The executable form of a descriptor.
///
/// Immutable once built; redefinition replaces the whole value, never
/// mutates it in place.
pub struct CompiledCommand {
    pub path: CommandPath,
    pub kind: CommandKind,
    pub scope: Option<ScopeId>,
    /// Display name at the default locale.
    pub name: String,
    /// Display description at the default locale; empty for context-menu
    /// commands.
    pub description: String,
    pub name_localizations: HashMap<String, String>,
    pub description_localizations: HashMap<String, String>,
    pub params: Vec<ParamBinding>,
    pub handler: Arc<dyn CommandHandler>,
}

impl std::fmt::Debug for CompiledCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledCommand")
            .field("path", &self.path)
            .field("kind", &self.kind)
            .field("scope", &self.scope)
            .field("name", &self.name)
            .field("description", &self.description)
            .field("name_localizations", &self.name_localizations)
            .field("description_localizations", &self.description_localizations)
            .field("params", &self.params.len())
            .finish_non_exhaustive()
    }
}

impl CompiledCommand {
    /// The full dotted id this command is keyed by.
    pub fn full_name(&self) -> String {
        self.path.full_name()
    }

    /// Option bindings in declared order.
    pub fn options(&self) -> impl Iterator<Item = &OptionBinding> {
        self.params.iter().filter_map(|p| match p {
            ParamBinding::Option(binding) => Some(binding),
            ParamBinding::Contextual { .. } => None,
        })
    }
}

/// Compiles descriptor tables into executable commands.
pub struct DescriptorCompiler {
    registry: Arc<ConverterRegistry>,
    locales: Arc<LocaleSettings>,
}

impl DescriptorCompiler {
    pub fn new(registry: Arc<ConverterRegistry>, locales: Arc<LocaleSettings>) -> Self {
        Self { registry, locales }
    }

    /// Compile every descriptor in a module.
    ///
    /// A failing descriptor aborts only itself: the failure is logged with
    /// its id and the remaining descriptors continue compiling.
    pub fn compile_module(&self, module: &dyn CommandModule) -> Vec<Arc<CompiledCommand>> {
        let module_namespace = module.namespace().map(str::to_string);
        let mut compiled = Vec::new();
        for descriptor in module.descriptors() {
            let id = descriptor.id.clone();
            match self.compile(descriptor, module_namespace.as_deref()) {
                Ok(command) => compiled.push(Arc::new(command)),
                Err(err) => {
                    error!(command = %id, error = %err, "skipping command, compilation failed");
                }
            }
        }
        compiled
    }

    /// Compile one descriptor.
    pub fn compile(
        &self,
        descriptor: CommandDescriptor,
        module_namespace: Option<&str>,
    ) -> Result<CompiledCommand, CompileError> {
        let CommandDescriptor {
            id,
            kind,
            scope,
            namespace,
            params: specs,
            handler,
        } = descriptor;

        let path = CommandPath::parse(&id)?;
        if kind.is_context() {
            if !path.is_root() {
                return Err(CompileError::InvalidDescriptor {
                    id,
                    reason: "context-menu commands cannot be nested".to_string(),
                });
            }
            if specs.iter().any(|p| matches!(p, ParamSpec::Option(_))) {
                return Err(CompileError::InvalidDescriptor {
                    id,
                    reason: "context-menu commands take no options".to_string(),
                });
            }
        }

        // Namespace resolution walks outward: descriptor override first,
        // then the enclosing module, then the engine default (no prefix).
        let namespace = namespace.as_deref().or(module_namespace);

        let name_key = format!("{id}.name");
        let name = self.require(namespace, &name_key)?;
        let name_localizations = self.locales.platform(namespace, &name_key);

        let (description, description_localizations) = if kind.is_context() {
            (String::new(), HashMap::new())
        } else {
            let description_key = format!("{id}.description");
            (
                self.require(namespace, &description_key)?,
                self.locales.platform(namespace, &description_key),
            )
        };

        let mut params = Vec::with_capacity(specs.len());
        for spec in specs {
            match spec {
                ParamSpec::Contextual { target } => {
                    let converter = self
                        .registry
                        .find_converter(TypeTag::None, target)
                        .ok_or_else(|| CompileError::UnresolvedConverter {
                            command: id.clone(),
                            param: format!("<contextual {target:?}>"),
                            from: TypeTag::None,
                            to: target,
                        })?;
                    params.push(ParamBinding::Contextual { target, converter });
                }
                ParamSpec::Option(option) => {
                    params.push(ParamBinding::Option(
                        self.bind_option(namespace, &id, option)?,
                    ));
                }
            }
        }

        Ok(CompiledCommand {
            path,
            kind,
            scope,
            name,
            description,
            name_localizations,
            description_localizations,
            params,
            handler,
        })
    }

    fn bind_option(
        &self,
        namespace: Option<&str>,
        command_id: &str,
        spec: OptionSpec,
    ) -> Result<OptionBinding, CompileError> {
        let raw_kind = spec.effective_raw_kind();
        let converter = match &spec.converter {
            Some(explicit) => Arc::clone(explicit),
            None => self
                .registry
                .find_converter(raw_kind, spec.target)
                .ok_or_else(|| CompileError::UnresolvedConverter {
                    command: command_id.to_string(),
                    param: spec.name.clone(),
                    from: raw_kind,
                    to: spec.target,
                })?,
        };

        let choices = spec
            .choices
            .iter()
            .map(|value| self.resolve_choice(namespace, command_id, &spec.name, value))
            .collect();

        Ok(OptionBinding {
            name: spec.name,
            raw_kind,
            target: spec.target,
            required: spec.required,
            converter,
            choices,
            min_value: spec.min_value,
            max_value: spec.max_value,
            min_length: spec.min_length,
            max_length: spec.max_length,
            channel_types: spec.channel_types,
            autocomplete: spec.autocomplete,
        })
    }

    fn require(&self, namespace: Option<&str>, key: &str) -> Result<String, CompileError> {
        self.locales.single(namespace, key).ok().ok_or_else(|| {
            CompileError::MissingTranslation {
                key: LocaleSettings::namespaced(namespace, key),
                locale: self.locales.default_locale().to_string(),
            }
        })
    }

    /// Choice display text is best-effort: an untranslated choice falls back
    /// to its stable value.
    fn resolve_choice(
        &self,
        namespace: Option<&str>,
        command_id: &str,
        option: &str,
        value: &str,
    ) -> CommandChoice {
        let key = format!("{command_id}.options.{option}.choices.{value}");
        let name = match self.locales.single(namespace, &key) {
            Translation::Found(text) => text,
            Translation::Unknown => {
                warn!(command = command_id, option, value, "choice has no translated display name");
                value.to_string()
            }
        };
        CommandChoice {
            value: value.to_string(),
            name,
            name_localizations: self.locales.platform(namespace, &key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{BoundArgs, InvocationContext};
    use crate::error::EngineResult;
    use crate::i18n::StaticTranslations;
    use crate::response::Response;
    use async_trait::async_trait;

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

    fn handler() -> Arc<dyn CommandHandler> {
        Arc::new(NoopHandler)
    }

    fn compiler(provider: StaticTranslations) -> DescriptorCompiler {
        DescriptorCompiler::new(
            Arc::new(ConverterRegistry::with_builtins()),
            Arc::new(LocaleSettings::new(Arc::new(provider), "en-US")),
        )
    }

    fn translations_for(id: &str, name: &str, description: &str) -> StaticTranslations {
        StaticTranslations::new()
            .with("en-US", &format!("{id}.name"), name)
            .with("en-US", &format!("{id}.description"), description)
    }

    #[test]
    fn test_compile_grouped_subcommand() {
        let compiler = compiler(translations_for(
            "config.user.language",
            "language",
            "Set your language",
        ));
        let descriptor = CommandDescriptor::slash("config.user.language", handler())
            .param(ParamSpec::Option(OptionSpec::required(
                "language",
                TypeTag::String,
            )));

        let command = compiler.compile(descriptor, None).unwrap();
        assert_eq!(command.path.root, "config");
        assert_eq!(command.path.group.as_deref(), Some("user"));
        assert_eq!(command.name, "language");
        assert_eq!(command.full_name(), "config.user.language");
        assert_eq!(command.options().count(), 1);
    }

    #[test]
    fn test_missing_translation_fails_compilation() {
        let compiler = compiler(StaticTranslations::new());
        let descriptor = CommandDescriptor::slash("ping", handler());
        let err = compiler.compile(descriptor, None).unwrap_err();
        assert!(matches!(err, CompileError::MissingTranslation { .. }));
    }

    #[test]
    fn test_namespace_override_changes_lookup_key() {
        let provider = StaticTranslations::new()
            .with("en-US", "bot.ping.name", "ping")
            .with("en-US", "bot.ping.description", "Measure latency");
        let compiler = compiler(provider);

        let descriptor = CommandDescriptor::slash("ping", handler()).with_namespace("bot");
        let command = compiler.compile(descriptor, None).unwrap();
        assert_eq!(command.name, "ping");

        // Without the override the unprefixed key is consulted and misses.
        let descriptor = CommandDescriptor::slash("ping", handler());
        assert!(compiler.compile(descriptor, None).is_err());
    }

    #[test]
    fn test_module_namespace_is_the_outer_fallback() {
        let provider = StaticTranslations::new()
            .with("en-US", "bot.ping.name", "ping")
            .with("en-US", "bot.ping.description", "Measure latency");
        let compiler = compiler(provider);
        let descriptor = CommandDescriptor::slash("ping", handler());
        let command = compiler.compile(descriptor, Some("bot")).unwrap();
        assert_eq!(command.name, "ping");
    }

    #[test]
    fn test_option_converter_resolves_chain() {
        let compiler = compiler(translations_for("remind", "remind", "Set a reminder"));
        let descriptor = CommandDescriptor::slash("remind", handler()).param(ParamSpec::Option(
            OptionSpec::required("when", TypeTag::Timestamp),
        ));

        let command = compiler.compile(descriptor, None).unwrap();
        let binding = command.options().next().unwrap();
        // Timestamp arrives as a string and converts through Duration.
        assert_eq!(binding.raw_kind, TypeTag::String);
        assert_eq!(binding.converter.input_type(), TypeTag::String);
        assert_eq!(binding.converter.output_type(), TypeTag::Timestamp);
    }

    #[test]
    fn test_explicit_converter_override_bypasses_resolution() {
        use crate::convert::{ConversionContext, Converter};
        use crate::value_objects::Value;

        /// Uppercases a string; no registry edge does this.
        struct Shout;

        #[async_trait]
        impl Converter for Shout {
            fn input_type(&self) -> TypeTag {
                TypeTag::String
            }

            fn output_type(&self) -> TypeTag {
                TypeTag::String
            }

            async fn convert(
                &self,
                _ctx: &ConversionContext<'_>,
                input: Value,
            ) -> EngineResult<Value> {
                match input {
                    Value::String(s) => Ok(Value::String(s.to_uppercase())),
                    other => Ok(other),
                }
            }
        }

        let compiler = compiler(translations_for("echo", "echo", "Echo back"));
        let descriptor = CommandDescriptor::slash("echo", handler()).param(ParamSpec::Option(
            OptionSpec::required("text", TypeTag::String).with_converter(Arc::new(Shout)),
        ));

        let command = compiler.compile(descriptor, None).unwrap();
        let binding = command.options().next().unwrap();
        let locales = LocaleSettings::new(Arc::new(StaticTranslations::new()), "en-US");
        let ctx = ConversionContext::detached(&locales);
        let converted = tokio_test::block_on(
            binding
                .converter
                .convert(&ctx, Value::String("hey".to_string())),
        )
        .unwrap();
        assert_eq!(converted, Value::String("HEY".to_string()));
    }

    #[test]
    fn test_unresolved_converter_is_a_compile_error() {
        let compiler = compiler(translations_for("odd", "odd", "Odd command"));
        let descriptor = CommandDescriptor::slash("odd", handler()).param(ParamSpec::Option(
            // No edge produces an attachment from a boolean.
            OptionSpec::required("x", TypeTag::Attachment).with_raw_kind(TypeTag::Boolean),
        ));
        let err = compiler.compile(descriptor, None).unwrap_err();
        assert!(matches!(err, CompileError::UnresolvedConverter { .. }));
    }

    #[test]
    fn test_context_commands_resolve_name_only() {
        let provider = StaticTranslations::new().with("en-US", "report.name", "Report");
        let compiler = compiler(provider);
        let descriptor = CommandDescriptor::user_context("report", handler());
        let command = compiler.compile(descriptor, None).unwrap();
        assert_eq!(command.name, "Report");
        assert!(command.description.is_empty());
    }

    #[test]
    fn test_context_commands_reject_options_and_nesting() {
        let provider = StaticTranslations::new().with("en-US", "report.name", "Report");
        let compiler = compiler(provider);

        let descriptor = CommandDescriptor::user_context("report", handler())
            .param(ParamSpec::Option(OptionSpec::required("x", TypeTag::String)));
        assert!(matches!(
            compiler.compile(descriptor, None),
            Err(CompileError::InvalidDescriptor { .. })
        ));

        let descriptor = CommandDescriptor::user_context("mod.report", handler());
        assert!(matches!(
            compiler.compile(descriptor, None),
            Err(CompileError::InvalidDescriptor { .. })
        ));
    }

    #[test]
    fn test_choice_display_names_come_from_translations() {
        let provider = translations_for("config.language", "language", "Set language")
            .with("en-US", "config.language.options.value.choices.en-US", "English")
            .with("de", "config.language.options.value.choices.en-US", "Englisch");
        let compiler = compiler(provider);

        let descriptor = CommandDescriptor::slash("config.language", handler()).param(
            ParamSpec::Option(
                OptionSpec::required("value", TypeTag::String).with_choices(["en-US", "de"]),
            ),
        );
        let command = compiler.compile(descriptor, None).unwrap();
        let binding = command.options().next().unwrap();

        assert_eq!(binding.choices[0].name, "English");
        assert_eq!(
            binding.choices[0].name_localizations.get("de").map(String::as_str),
            Some("Englisch")
        );
        // Untranslated choice falls back to its stable value.
        assert_eq!(binding.choices[1].name, "de");
    }

    #[test]
    fn test_module_compilation_isolates_failures() {
        struct TwoCommands;

        impl CommandModule for TwoCommands {
            fn descriptors(&self) -> Vec<CommandDescriptor> {
                vec![
                    CommandDescriptor::slash("good", Arc::new(NoopHandler)),
                    CommandDescriptor::slash("bad", Arc::new(NoopHandler)),
                ]
            }
        }

        let compiler = compiler(translations_for("good", "good", "A good command"));
        let compiled = compiler.compile_module(&TwoCommands);
        assert_eq!(compiled.len(), 1);
        assert_eq!(compiled[0].full_name(), "good");
    }
}
