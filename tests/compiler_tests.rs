//! Tests for descriptor compilation and command tree shape
//!
//! These tests exercise the compile path end to end: descriptor tables in,
//! compiled commands and platform snapshots out, including the dotted-id
//! grouping rules and partial-failure isolation.

use async_trait::async_trait;
use interaction_commands::{
    BoundArgs, CommandDescriptor, CommandEngine, CommandHandler, CommandModule, CommandSink,
    CommandSnapshot, EngineResult, InvocationContext, LocaleSettings, NodeKind, OptionSpec,
    ParamSpec, Response, StaticTranslations, TypeTag,
};
use std::sync::{Arc, Mutex};

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

/// Sink capturing every snapshot push.
#[derive(Default)]
struct RecordingSink {
    full: Mutex<Vec<Vec<CommandSnapshot>>>,
    incremental: Mutex<Vec<CommandSnapshot>>,
}

#[async_trait]
impl CommandSink for RecordingSink {
    async fn push_all(&self, snapshot: &[CommandSnapshot]) -> anyhow::Result<()> {
        self.full.lock().unwrap().push(snapshot.to_vec());
        Ok(())
    }

    async fn push_one(&self, command: &CommandSnapshot) -> anyhow::Result<()> {
        self.incremental.lock().unwrap().push(command.clone());
        Ok(())
    }
}

struct ConfigModule;

impl CommandModule for ConfigModule {
    fn descriptors(&self) -> Vec<CommandDescriptor> {
        vec![
            CommandDescriptor::slash("config.language", handler()).param(ParamSpec::Option(
                OptionSpec::required("value", TypeTag::String).with_choices(["en-US", "de"]),
            )),
            CommandDescriptor::slash("config.user.language", handler()).param(ParamSpec::Option(
                OptionSpec::required("value", TypeTag::String),
            )),
            CommandDescriptor::slash("ping", handler()),
        ]
    }
}

fn config_translations() -> StaticTranslations {
    StaticTranslations::new()
        .with("en-US", "config.language.name", "language")
        .with("en-US", "config.language.description", "Set the server language")
        .with("en-US", "config.user.language.name", "language")
        .with("en-US", "config.user.language.description", "Set your language")
        .with("en-US", "ping.name", "ping")
        .with("en-US", "ping.description", "Measure latency")
        .with("de", "ping.name", "ping")
}

fn engine_with(provider: StaticTranslations) -> (CommandEngine, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let engine = CommandEngine::new(
        LocaleSettings::new(Arc::new(provider), "en-US"),
        Arc::clone(&sink) as Arc<dyn CommandSink>,
    );
    (engine, sink)
}

#[tokio::test]
async fn test_grouping_rules_shape_the_snapshot() {
    let (engine, sink) = engine_with(config_translations());
    let registered = engine.load_module(&ConfigModule).await.unwrap();
    assert_eq!(registered, 3);
    engine.upsert_commands().await.unwrap();

    let pushes = sink.full.lock().unwrap();
    assert_eq!(pushes.len(), 1);
    let roots = &pushes[0];
    assert_eq!(roots.len(), 2);

    // "config" root contains a direct subcommand and a "user" group.
    let config = roots.iter().find(|r| r.name == "config").unwrap();
    assert_eq!(config.kind, NodeKind::Root);
    assert_eq!(config.children.len(), 2);

    let direct = &config.children[0];
    assert_eq!(direct.kind, NodeKind::Subcommand);
    assert_eq!(direct.name, "language");
    assert_eq!(direct.options.len(), 1);
    assert_eq!(direct.options[0].choices.len(), 2);

    let group = &config.children[1];
    assert_eq!(group.kind, NodeKind::Group);
    assert_eq!(group.name, "user");
    assert_eq!(group.children.len(), 1);
    assert_eq!(group.children[0].kind, NodeKind::Subcommand);
    assert_eq!(group.children[0].name, "language");

    // "ping" is a standalone root leaf.
    let ping = roots.iter().find(|r| r.name == "ping").unwrap();
    assert_eq!(ping.kind, NodeKind::Root);
    assert!(ping.children.is_empty());
    assert_eq!(
        ping.name_localizations.get("de").map(String::as_str),
        Some("ping")
    );
}

#[tokio::test]
async fn test_root_conflict_is_a_registration_error() {
    struct ConflictModule;

    impl CommandModule for ConflictModule {
        fn descriptors(&self) -> Vec<CommandDescriptor> {
            vec![
                CommandDescriptor::slash("config", handler()),
                CommandDescriptor::slash("config.language", handler()),
            ]
        }
    }

    let provider = StaticTranslations::new()
        .with("en-US", "config.name", "config")
        .with("en-US", "config.description", "Configure the bot")
        .with("en-US", "config.language.name", "language")
        .with("en-US", "config.language.description", "Set the language");
    let (engine, _sink) = engine_with(provider);

    // Both descriptors compile; the second registration trips the conflict.
    let compiled = engine.discover_commands(&ConflictModule);
    assert_eq!(compiled.len(), 2);
    assert!(engine.load_module(&ConflictModule).await.is_err());

    // The standalone root survived; the conflicting subcommand did not.
    assert!(engine.get_command("config", None).await.is_some());
    assert!(engine.get_command("config.language", None).await.is_none());
}

#[tokio::test]
async fn test_missing_translation_skips_only_that_entry() {
    // "config.user.language" has no translations; its siblings compile.
    let provider = StaticTranslations::new()
        .with("en-US", "config.language.name", "language")
        .with("en-US", "config.language.description", "Set the server language")
        .with("en-US", "ping.name", "ping")
        .with("en-US", "ping.description", "Measure latency");
    let (engine, _sink) = engine_with(provider);

    let compiled = engine.discover_commands(&ConfigModule);
    let names: Vec<String> = compiled.iter().map(|c| c.full_name()).collect();
    assert_eq!(names, vec!["config.language".to_string(), "ping".to_string()]);
}

#[tokio::test]
async fn test_compiled_commands_are_addressable_by_full_name() {
    let (engine, _sink) = engine_with(config_translations());
    engine.load_module(&ConfigModule).await.unwrap();

    let command = engine.get_command("config.user.language", None).await.unwrap();
    assert_eq!(command.path.root, "config");
    assert_eq!(command.path.group.as_deref(), Some("user"));
    assert_eq!(command.name, "language");
    assert_eq!(command.description, "Set your language");

    assert!(engine.get_command("config.user", None).await.is_none());
}

#[tokio::test]
async fn test_timestamp_option_binds_a_string_chain() {
    struct RemindModule;

    impl CommandModule for RemindModule {
        fn descriptors(&self) -> Vec<CommandDescriptor> {
            vec![
                CommandDescriptor::slash("remind", handler()).param(ParamSpec::Option(
                    OptionSpec::required("when", TypeTag::Timestamp),
                )),
            ]
        }
    }

    let provider = StaticTranslations::new()
        .with("en-US", "remind.name", "remind")
        .with("en-US", "remind.description", "Set a reminder");
    let (engine, sink) = engine_with(provider);
    engine.load_module(&RemindModule).await.unwrap();
    engine.upsert_commands().await.unwrap();

    // The platform collects the option as a string; the converter chain is
    // an engine-internal concern.
    let pushes = sink.full.lock().unwrap();
    let remind = &pushes[0][0];
    assert_eq!(remind.options[0].kind, TypeTag::String);

    let command = engine.get_command("remind", None).await.unwrap();
    let binding = command.options().next().unwrap();
    assert_eq!(binding.converter.input_type(), TypeTag::String);
    assert_eq!(binding.converter.output_type(), TypeTag::Timestamp);
}
