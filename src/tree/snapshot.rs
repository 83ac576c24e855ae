//! Platform-facing command tree snapshots
//!
//! The snapshot is the serializable shape pushed to the platform's command
//! upsert surface: root nodes with their implicit groups and subcommands,
//! display text localizations, and option metadata. Handlers and converters
//! never appear here.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::compiler::{CompiledCommand, OptionBinding};
use crate::value_objects::{ChannelType, CommandChoice, CommandKind, ScopeId, TypeTag};

/// Kind of a node in the pushed tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Addressable root command.
    Root,
    /// Implicitly-created group under a root.
    Group,
    /// Leaf subcommand.
    Subcommand,
    /// Context-menu entry.
    Context,
}

/// One node of the pushed command tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandSnapshot {
    pub kind: NodeKind,
    pub name: String,
    pub description: String,
    pub scope: Option<ScopeId>,
    pub name_localizations: HashMap<String, String>,
    pub description_localizations: HashMap<String, String>,
    pub options: Vec<OptionSnapshot>,
    pub children: Vec<CommandSnapshot>,
}

/// Option metadata as the platform sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionSnapshot {
    pub name: String,
    /// Raw kind the platform collects the value as.
    pub kind: TypeTag,
    pub required: bool,
    pub choices: Vec<CommandChoice>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub min_length: Option<u32>,
    pub max_length: Option<u32>,
    pub channel_types: Vec<ChannelType>,
    pub autocomplete: bool,
}

impl OptionSnapshot {
    fn from_binding(binding: &OptionBinding) -> Self {
        Self {
            name: binding.name.clone(),
            kind: binding.raw_kind,
            required: binding.required,
            choices: binding.choices.clone(),
            min_value: binding.min_value,
            max_value: binding.max_value,
            min_length: binding.min_length,
            max_length: binding.max_length,
            channel_types: binding.channel_types.clone(),
            autocomplete: binding.autocomplete.is_some(),
        }
    }
}

fn leaf_node(kind: NodeKind, command: &CompiledCommand) -> CommandSnapshot {
    CommandSnapshot {
        kind,
        name: command.name.clone(),
        description: command.description.clone(),
        scope: command.scope,
        name_localizations: command.name_localizations.clone(),
        description_localizations: command.description_localizations.clone(),
        options: command.options().map(OptionSnapshot::from_binding).collect(),
        children: Vec::new(),
    }
}

fn container_node(kind: NodeKind, name: &str, scope: Option<ScopeId>) -> CommandSnapshot {
    CommandSnapshot {
        kind,
        name: name.to_string(),
        description: String::new(),
        scope,
        name_localizations: HashMap::new(),
        description_localizations: HashMap::new(),
        options: Vec::new(),
        children: Vec::new(),
    }
}

/// Assemble root-level snapshots from compiled commands, grouping
/// subcommands under their roots and implicit groups. Registration order is
/// preserved for roots and within each root.
pub fn assemble(commands: &[Arc<CompiledCommand>]) -> Vec<CommandSnapshot> {
    let mut roots: Vec<CommandSnapshot> = Vec::new();
    // Container positions keyed by (scope, root segment); display names are
    // localized and cannot serve as keys.
    let mut containers: HashMap<(Option<ScopeId>, String), usize> = HashMap::new();

    for command in commands {
        if command.path.is_root() {
            let kind = match command.kind {
                CommandKind::Slash => NodeKind::Root,
                _ => NodeKind::Context,
            };
            roots.push(leaf_node(kind, command));
            continue;
        }

        let key = (command.scope, command.path.root.clone());
        let index = *containers.entry(key).or_insert_with(|| {
            roots.push(container_node(NodeKind::Root, &command.path.root, command.scope));
            roots.len() - 1
        });
        let root = &mut roots[index];

        let leaf = leaf_node(NodeKind::Subcommand, command);
        match &command.path.group {
            None => root.children.push(leaf),
            Some(group_name) => {
                let group = match root
                    .children
                    .iter_mut()
                    .find(|c| c.kind == NodeKind::Group && c.name == *group_name)
                {
                    Some(existing) => existing,
                    None => {
                        let scope = command.scope;
                        root.children.push(container_node(NodeKind::Group, group_name, scope));
                        root.children.last_mut().unwrap()
                    }
                };
                group.children.push(leaf);
            }
        }
    }

    roots
}
