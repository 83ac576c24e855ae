//! External platform seams
//!
//! The transport delivering events and the surface replies travel over are
//! not part of this crate; they appear only as traits. An [`InboundEvent`]
//! exposes the full command path, originating scope, ambient context, and
//! raw option values; a [`ReplySurface`] accepts at most one terminal send
//! per invocation; a [`CommandSink`] receives command-tree snapshots.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::tree::snapshot::CommandSnapshot;
use crate::value_objects::{ChannelRef, ScopeId, TypeTag, UserRef, Value};

/// An outbound reply before it is handed to the platform.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundReply {
    /// Message text.
    pub content: String,
    /// Visible only to the invoker when set.
    pub ephemeral: bool,
}

impl OutboundReply {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: false,
        }
    }

    pub fn ephemeral(mut self) -> Self {
        self.ephemeral = true;
        self
    }
}

/// Failure to deliver a reply.
#[derive(Debug, Clone, Error)]
pub enum ReplyError {
    /// The originating event was already answered or its response window
    /// expired. Treated as a low-severity no-op, never re-surfaced.
    #[error("the originating event can no longer be answered")]
    Expired,

    /// Transport-level delivery failure.
    #[error("reply transport failure: {0}")]
    Transport(String),
}

/// Reply/defer surface of one inbound event.
#[async_trait]
pub trait ReplySurface: Send + Sync {
    /// Send the terminal reply.
    async fn send(&self, reply: OutboundReply) -> Result<(), ReplyError>;

    /// Defer acknowledgement, optionally marking the eventual reply ephemeral.
    async fn defer(&self, ephemeral: bool) -> Result<(), ReplyError>;
}

/// One inbound command invocation delivered by the platform.
pub trait InboundEvent: Send + Sync {
    /// Full dotted command path (`config.user.language`).
    fn full_name(&self) -> &str;

    /// Originating scope, absent for direct/global contexts.
    fn scope(&self) -> Option<ScopeId>;

    /// Locale of the caller.
    fn locale(&self) -> &str;

    /// The user who invoked the command.
    fn invoker(&self) -> UserRef;

    /// The channel the invocation originated in.
    fn channel(&self) -> ChannelRef;

    /// Raw value of a named option at its declared kind, if supplied.
    fn raw_option(&self, name: &str, kind: TypeTag) -> Option<Value>;

    /// The reply surface for this event.
    fn reply_surface(&self) -> Arc<dyn ReplySurface>;
}

/// Platform command-upsert surface.
#[async_trait]
pub trait CommandSink: Send + Sync {
    /// Replace the platform's view with a full snapshot of the tree.
    async fn push_all(&self, snapshot: &[CommandSnapshot]) -> anyhow::Result<()>;

    /// Push one root-level command incrementally.
    async fn push_one(&self, command: &CommandSnapshot) -> anyhow::Result<()>;
}
