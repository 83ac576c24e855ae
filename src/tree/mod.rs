//! Command tree storage and platform synchronization
//!
//! Compiled commands are keyed by `(scope, full name)`. The tree supports
//! concurrent reads throughout; a registration is an atomic swap-in of one
//! entry, validated before anything is inserted so a failed registration
//! leaves the tree untouched. The full snapshot is pushed to the platform
//! exactly once when the startup window closes; registrations after that
//! are pushed incrementally, one root at a time.

pub mod snapshot;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::compiler::CompiledCommand;
use crate::error::{CompileError, EngineError, EngineResult};
use crate::event::CommandSink;
use crate::value_objects::ScopeId;
use self::snapshot::{CommandSnapshot, assemble};

/// How a root segment is used within one scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RootUse {
    /// The root is itself an addressable command.
    Standalone,
    /// The root only parents subcommands or groups.
    Parent,
}

#[derive(Default)]
struct TreeState {
    global: HashMap<String, Arc<CompiledCommand>>,
    scoped: HashMap<(ScopeId, String), Arc<CompiledCommand>>,
    roots: HashMap<(Option<ScopeId>, String), RootUse>,
    /// Registration order, for deterministic snapshots.
    order: Vec<Arc<CompiledCommand>>,
}

/// Owner of all registered commands.
pub struct CommandTree {
    state: RwLock<TreeState>,
    /// Set once the initial snapshot has been pushed.
    synced: AtomicBool,
    sink: Arc<dyn CommandSink>,
}

impl CommandTree {
    pub fn new(sink: Arc<dyn CommandSink>) -> Self {
        Self {
            state: RwLock::new(TreeState::default()),
            synced: AtomicBool::new(false),
            sink,
        }
    }

    /// Register one compiled command.
    ///
    /// A duplicate `(scope, full name)` key or a root used both standalone
    /// and as a parent is a hard error; the tree is unchanged afterwards.
    /// After the startup window has closed, the affected root subtree is
    /// pushed to the platform incrementally.
    pub async fn register(&self, command: Arc<CompiledCommand>) -> EngineResult<()> {
        let full_name = command.full_name();
        {
            let mut state = self.state.write().await;

            let duplicate = match command.scope {
                Some(scope) => state.scoped.contains_key(&(scope, full_name.clone())),
                None => state.global.contains_key(&full_name),
            };
            if duplicate {
                return Err(CompileError::DuplicateCommand {
                    full_name,
                    scope: command
                        .scope
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| "global".to_string()),
                }
                .into());
            }

            let root_key = (command.scope, command.path.root.clone());
            let root_use = if command.path.is_root() {
                RootUse::Standalone
            } else {
                RootUse::Parent
            };
            if let Some(existing) = state.roots.get(&root_key) {
                if *existing != root_use {
                    return Err(CompileError::RootConflict {
                        root: command.path.root.clone(),
                    }
                    .into());
                }
            }

            state.roots.insert(root_key, root_use);
            match command.scope {
                Some(scope) => {
                    state
                        .scoped
                        .insert((scope, full_name.clone()), Arc::clone(&command));
                }
                None => {
                    state.global.insert(full_name.clone(), Arc::clone(&command));
                }
            }
            state.order.push(Arc::clone(&command));
        }
        debug!(command = %full_name, "registered command");

        if self.synced.load(Ordering::Acquire) {
            let subtree = self.root_subtree(&command).await?;
            self.sink
                .push_one(&subtree)
                .await
                .map_err(EngineError::Internal)?;
        }
        Ok(())
    }

    /// Look up a command, consulting the scope-specific table before falling
    /// back to the global one.
    pub async fn lookup(
        &self,
        full_name: &str,
        scope: Option<ScopeId>,
    ) -> Option<Arc<CompiledCommand>> {
        let state = self.state.read().await;
        if let Some(scope) = scope {
            if let Some(command) = state.scoped.get(&(scope, full_name.to_string())) {
                return Some(Arc::clone(command));
            }
        }
        state.global.get(full_name).map(Arc::clone)
    }

    /// Push the complete tree snapshot to the platform.
    ///
    /// Performed exactly once: the first call closes the startup window and
    /// pushes; later calls are no-ops. A failed push reopens the window so
    /// the embedder can retry.
    pub async fn upsert_commands(&self) -> EngineResult<()> {
        if self.synced.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let snapshots = {
            let state = self.state.read().await;
            assemble(&state.order)
        };
        info!(roots = snapshots.len(), "pushing initial command tree snapshot");
        if let Err(err) = self.sink.push_all(&snapshots).await {
            self.synced.store(false, Ordering::Release);
            return Err(EngineError::Internal(err));
        }
        Ok(())
    }

    /// Number of registered commands.
    pub async fn len(&self) -> usize {
        self.state.read().await.order.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.order.is_empty()
    }

    /// The root-level snapshot containing `command`, assembled from the
    /// current tree state.
    async fn root_subtree(&self, command: &CompiledCommand) -> EngineResult<CommandSnapshot> {
        let members: Vec<Arc<CompiledCommand>> = {
            let state = self.state.read().await;
            state
                .order
                .iter()
                .filter(|c| c.scope == command.scope && c.path.root == command.path.root)
                .map(Arc::clone)
                .collect()
        };
        assemble(&members)
            .pop()
            .ok_or_else(|| anyhow::anyhow!("registered command vanished from tree state").into())
    }
}
