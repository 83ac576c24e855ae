//! Engine facade
//!
//! [`CommandEngine`] wires the converter registry, descriptor compiler,
//! command tree, and dispatcher together behind the crate's public surface.
//! Construct one at startup with the embedder's locale settings and command
//! sink, load modules, push the tree, then feed it events.

use std::sync::Arc;

use crate::compiler::{CompiledCommand, DescriptorCompiler};
use crate::convert::ConverterRegistry;
use crate::descriptor::CommandModule;
use crate::dispatch::{DispatchOutcome, InvocationDispatcher};
use crate::error::EngineResult;
use crate::event::{CommandSink, InboundEvent};
use crate::i18n::LocaleSettings;
use crate::tree::CommandTree;
use crate::value_objects::ScopeId;

/// The assembled command engine.
pub struct CommandEngine {
    registry: Arc<ConverterRegistry>,
    compiler: DescriptorCompiler,
    tree: Arc<CommandTree>,
    dispatcher: InvocationDispatcher,
}

impl CommandEngine {
    /// Engine with the built-in converter set.
    pub fn new(locales: LocaleSettings, sink: Arc<dyn CommandSink>) -> Self {
        Self::with_registry(locales, sink, ConverterRegistry::with_builtins())
    }

    /// Engine with a caller-assembled converter registry.
    ///
    /// The registry is frozen here; all conversion edges must be registered
    /// before the engine is built.
    pub fn with_registry(
        locales: LocaleSettings,
        sink: Arc<dyn CommandSink>,
        registry: ConverterRegistry,
    ) -> Self {
        let registry = Arc::new(registry);
        let locales = Arc::new(locales);
        let compiler = DescriptorCompiler::new(Arc::clone(&registry), Arc::clone(&locales));
        let tree = Arc::new(CommandTree::new(sink));
        let dispatcher = InvocationDispatcher::new(Arc::clone(&tree), Arc::clone(&locales));
        Self {
            registry,
            compiler,
            tree,
            dispatcher,
        }
    }

    /// The shared converter registry.
    pub fn registry(&self) -> &ConverterRegistry {
        &self.registry
    }

    /// Compile a module's descriptor table without registering anything.
    ///
    /// Failing descriptors are logged and skipped; the returned list holds
    /// the survivors.
    pub fn discover_commands(&self, module: &dyn CommandModule) -> Vec<Arc<CompiledCommand>> {
        self.compiler.compile_module(module)
    }

    /// Register one compiled command.
    pub async fn register_command(&self, command: Arc<CompiledCommand>) -> EngineResult<()> {
        self.tree.register(command).await
    }

    /// Compile and register a module; returns how many commands registered.
    ///
    /// Used both for startup loading and for hot-loading additional modules
    /// after the initial snapshot has been pushed.
    pub async fn load_module(&self, module: &dyn CommandModule) -> EngineResult<usize> {
        let mut registered = 0;
        for command in self.discover_commands(module) {
            self.register_command(command).await?;
            registered += 1;
        }
        Ok(registered)
    }

    /// Push the command tree to the platform (once; see
    /// [`CommandTree::upsert_commands`]).
    pub async fn upsert_commands(&self) -> EngineResult<()> {
        self.tree.upsert_commands().await
    }

    /// Dispatch one inbound event.
    pub async fn on_event(&self, event: &dyn InboundEvent) -> DispatchOutcome {
        self.dispatcher.on_event(event).await
    }

    /// Look up a registered command.
    pub async fn get_command(
        &self,
        full_name: &str,
        scope: Option<ScopeId>,
    ) -> Option<Arc<CompiledCommand>> {
        self.tree.lookup(full_name, scope).await
    }
}
