//! Declarative command-binding engine
//!
//! This crate compiles declarative command descriptors into an executable,
//! strongly-typed invocation pipeline for an interactive request/response
//! platform. It provides:
//! - A converter registry that resolves typed conversions by graph search,
//!   chaining edges when no direct converter exists
//! - A descriptor compiler turning handler modules into a hierarchical
//!   command tree with localized display text and bound converters
//! - A dispatcher that extracts, converts, and binds arguments per inbound
//!   event, invokes the handler, and resolves its polymorphic response
//!
//! Wire transport, configuration storage, and translation-file loading are
//! external collaborators, consumed through the traits in [`event`] and
//! [`i18n`].

pub mod compiler;
pub mod convert;
pub mod descriptor;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod event;
pub mod i18n;
pub mod response;
pub mod tree;
pub mod value_objects;

// Re-export main types
pub use compiler::{CompiledCommand, DescriptorCompiler, OptionBinding, ParamBinding};
pub use convert::{
    ChainConverter, ConversionContext, Converter, ConverterRegistry, IdentityConverter,
};
pub use descriptor::{
    CommandDescriptor, CommandHandler, CommandModule, OptionSpec, ParamSpec,
};
pub use dispatch::{BoundArgs, DispatchOutcome, InvocationContext, InvocationDispatcher};
pub use engine::CommandEngine;
pub use error::{CompileError, EngineError, EngineResult, UserError};
pub use event::{CommandSink, InboundEvent, OutboundReply, ReplyError, ReplySurface};
pub use i18n::{LocaleSettings, StaticTranslations, Translation, TranslationProvider};
pub use response::{Response, ResponseResolver, ResponseText};
pub use tree::CommandTree;
pub use tree::snapshot::{CommandSnapshot, NodeKind, OptionSnapshot};
pub use value_objects::{
    AttachmentRef, ChannelRef, ChannelType, CommandChoice, CommandKind, CommandPath,
    RoleRef, ScopeId, TypeTag, UserRef, Value,
};
