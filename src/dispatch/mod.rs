//! Event dispatch
//!
//! One [`InvocationDispatcher::on_event`] call per inbound event: look up
//! the compiled command, bind every parameter in declared order, invoke the
//! handler, and hand its response to the resolver. This is the single
//! recovery boundary of the engine — user errors are replied and never
//! logged as faults, anything else is logged with command identity and
//! answered with a generic localized failure, and every path produces
//! exactly one terminal reply or deferral.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::compiler::{CompiledCommand, ParamBinding};
use crate::convert::ConversionContext;
use crate::error::{EngineError, EngineResult, UserError};
use crate::event::{InboundEvent, OutboundReply, ReplyError};
use crate::i18n::LocaleSettings;
use crate::response::ResponseResolver;
use crate::tree::CommandTree;
use crate::value_objects::{ChannelRef, RoleRef, ScopeId, UserRef, Value};

/// Translation keys for the dispatcher's own replies.
const KEY_GENERIC_FAILURE: &str = "error.generic";
const KEY_UNKNOWN_COMMAND: &str = "error.unknown_command";

const FALLBACK_GENERIC_FAILURE: &str = "Something went wrong while running this command.";
const FALLBACK_UNKNOWN_COMMAND: &str = "This command is not available.";

/// Ambient context handed to handlers and contextual converters.
pub struct InvocationContext<'a> {
    pub event: &'a dyn InboundEvent,
    pub command: &'a CompiledCommand,
    pub locales: &'a LocaleSettings,
}

/// Converted arguments in declared order.
///
/// Contextual parameters are positional (in declaration order); options are
/// addressed by name. An optional option the caller did not supply is
/// stored as the explicit absent marker and surfaces as `None` from the
/// typed accessors.
#[derive(Debug, Default)]
pub struct BoundArgs {
    contextual: Vec<Value>,
    options: HashMap<String, Value>,
}

impl BoundArgs {
    /// Contextual value at its declaration index.
    pub fn contextual(&self, index: usize) -> Option<&Value> {
        self.contextual.get(index)
    }

    /// Raw access to a converted option value.
    pub fn option(&self, name: &str) -> Option<&Value> {
        self.options.get(name)
    }

    fn present(&self, name: &str) -> Option<&Value> {
        self.options.get(name).filter(|v| !v.is_absent())
    }

    pub fn string(&self, name: &str) -> Option<&str> {
        self.present(name).and_then(Value::as_str)
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        self.present(name).and_then(Value::as_integer)
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.present(name).and_then(Value::as_number)
    }

    pub fn boolean(&self, name: &str) -> Option<bool> {
        self.present(name).and_then(Value::as_boolean)
    }

    pub fn duration(&self, name: &str) -> Option<chrono::Duration> {
        self.present(name).and_then(Value::as_duration)
    }

    pub fn timestamp(&self, name: &str) -> Option<chrono::DateTime<chrono::Utc>> {
        self.present(name).and_then(Value::as_timestamp)
    }

    pub fn user(&self, name: &str) -> Option<&UserRef> {
        match self.present(name) {
            Some(Value::User(user)) => Some(user),
            _ => None,
        }
    }

    pub fn channel(&self, name: &str) -> Option<&ChannelRef> {
        match self.present(name) {
            Some(Value::Channel(channel)) => Some(channel),
            _ => None,
        }
    }

    pub fn role(&self, name: &str) -> Option<&RoleRef> {
        match self.present(name) {
            Some(Value::Role(role)) => Some(role),
            _ => None,
        }
    }

    pub fn scope(&self, index: usize) -> Option<ScopeId> {
        match self.contextual(index) {
            Some(Value::Scope(scope)) => Some(*scope),
            _ => None,
        }
    }
}

/// What an invocation came to, for callers that observe dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Handler ran and its response was resolved.
    Completed,
    /// No compiled command matched the event.
    Miss,
    /// A converter or handler raised a deliberate user-facing error.
    UserFault,
    /// An internal fault was recovered at the boundary.
    InternalFault,
}

/// Routes inbound events through binding, invocation, and response
/// resolution.
pub struct InvocationDispatcher {
    tree: Arc<CommandTree>,
    locales: Arc<LocaleSettings>,
    resolver: ResponseResolver,
}

impl InvocationDispatcher {
    pub fn new(tree: Arc<CommandTree>, locales: Arc<LocaleSettings>) -> Self {
        let resolver = ResponseResolver::new(Arc::clone(&locales));
        Self {
            tree,
            locales,
            resolver,
        }
    }

    /// Dispatch one inbound event.
    ///
    /// Never returns an error: every failure mode is recovered here and
    /// answered to the caller.
    pub async fn on_event(&self, event: &dyn InboundEvent) -> DispatchOutcome {
        let full_name = event.full_name().to_string();
        let scope = event.scope();

        let Some(command) = self.tree.lookup(&full_name, scope).await else {
            warn!(command = %full_name, ?scope, "no compiled command for inbound event");
            self.reply_localized(event, KEY_UNKNOWN_COMMAND, FALLBACK_UNKNOWN_COMMAND)
                .await;
            return DispatchOutcome::Miss;
        };

        let args = match self.bind_arguments(event, &command).await {
            Ok(args) => args,
            Err(EngineError::User(user_error)) => {
                debug!(command = %full_name, "conversion rejected user input");
                self.reply_user_error(event, &user_error).await;
                return DispatchOutcome::UserFault;
            }
            Err(err) => {
                error!(command = %full_name, error = ?err, "argument binding failed");
                self.reply_localized(event, KEY_GENERIC_FAILURE, FALLBACK_GENERIC_FAILURE)
                    .await;
                return DispatchOutcome::InternalFault;
            }
        };

        let ctx = InvocationContext {
            event,
            command: &command,
            locales: &self.locales,
        };
        match command.handler.invoke(&ctx, &args).await {
            Ok(response) => {
                let surface = event.reply_surface();
                self.resolver
                    .resolve(response, surface.as_ref(), event.locale(), &full_name)
                    .await;
                DispatchOutcome::Completed
            }
            Err(EngineError::User(user_error)) => {
                self.reply_user_error(event, &user_error).await;
                DispatchOutcome::UserFault
            }
            Err(err) => {
                error!(command = %full_name, error = ?err, "handler failed");
                self.reply_localized(event, KEY_GENERIC_FAILURE, FALLBACK_GENERIC_FAILURE)
                    .await;
                DispatchOutcome::InternalFault
            }
        }
    }

    /// Bind every declared parameter in order.
    async fn bind_arguments(
        &self,
        event: &dyn InboundEvent,
        command: &CompiledCommand,
    ) -> EngineResult<BoundArgs> {
        let ctx = ConversionContext::new(event, &self.locales);
        let mut args = BoundArgs::default();

        for param in &command.params {
            match param {
                ParamBinding::Contextual { converter, .. } => {
                    let value = converter.convert(&ctx, Value::None).await?;
                    args.contextual.push(value);
                }
                ParamBinding::Option(binding) => {
                    match event.raw_option(&binding.name, binding.raw_kind) {
                        Some(raw) => {
                            let value = binding.converter.convert(&ctx, raw).await?;
                            args.options.insert(binding.name.clone(), value);
                        }
                        None if !binding.required => {
                            // Passed through as the explicit absent marker,
                            // never a synthesized default.
                            args.options.insert(binding.name.clone(), Value::Absent);
                        }
                        None => {
                            return Err(anyhow::anyhow!(
                                "required option '{}' missing from event",
                                binding.name
                            )
                            .into());
                        }
                    }
                }
            }
        }

        Ok(args)
    }

    async fn reply_user_error(&self, event: &dyn InboundEvent, user_error: &UserError) {
        let content = user_error
            .key()
            .and_then(|key| self.locales.render(key, event.locale()))
            .unwrap_or_else(|| user_error.text().to_string());
        self.deliver(event, OutboundReply::text(content).ephemeral())
            .await;
    }

    async fn reply_localized(&self, event: &dyn InboundEvent, key: &str, fallback: &str) {
        let content = self
            .locales
            .render(key, event.locale())
            .unwrap_or_else(|| fallback.to_string());
        self.deliver(event, OutboundReply::text(content).ephemeral())
            .await;
    }

    async fn deliver(&self, event: &dyn InboundEvent, reply: OutboundReply) {
        match event.reply_surface().send(reply).await {
            Ok(()) => {}
            Err(ReplyError::Expired) => {
                debug!(command = event.full_name(), "reply window expired, dropping reply");
            }
            Err(err) => {
                warn!(command = event.full_name(), error = %err, "failed to deliver reply");
            }
        }
    }
}
