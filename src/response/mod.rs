//! Polymorphic response resolution
//!
//! A handler's return value is a closed sum type rather than an open set of
//! runtime shapes: text sent verbatim, a deferred acknowledgement, a pending
//! future resolved recursively, or a localized message with an outbound
//! modifier. The resolver guarantees exactly one terminal send per
//! invocation; a reply against an expired event is a logged no-op.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::event::{OutboundReply, ReplyError, ReplySurface};
use crate::i18n::LocaleSettings;

/// A future resolving to a further response.
pub type PendingResponse = Pin<Box<dyn Future<Output = Response> + Send>>;

/// Caller-supplied mutation applied to the outbound reply before sending.
pub type ReplyModifier = Box<dyn FnOnce(&mut OutboundReply) + Send>;

/// Text of a structured message response.
pub enum ResponseText {
    /// Send as-is.
    Literal(String),
    /// Render through the translation provider in the caller's locale.
    Localized { key: String },
}

impl ResponseText {
    pub fn literal(text: impl Into<String>) -> Self {
        Self::Literal(text.into())
    }

    pub fn localized(key: impl Into<String>) -> Self {
        Self::Localized { key: key.into() }
    }
}

/// The closed set of handler return shapes.
pub enum Response {
    /// Plain text, sent verbatim.
    Text(String),
    /// Defer acknowledgement; the flag marks the eventual reply ephemeral.
    Defer { ephemeral: bool },
    /// An asynchronous continuation, resolved recursively on completion.
    Pending(PendingResponse),
    /// Localized text with an optional outbound modifier.
    Message {
        text: ResponseText,
        modifier: Option<ReplyModifier>,
    },
}

impl Response {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(content.into())
    }

    pub fn defer(ephemeral: bool) -> Self {
        Self::Defer { ephemeral }
    }

    /// Wrap a future producing a further response.
    pub fn pending(future: impl Future<Output = Response> + Send + 'static) -> Self {
        Self::Pending(Box::pin(future))
    }

    pub fn message(text: ResponseText) -> Self {
        Self::Message {
            text,
            modifier: None,
        }
    }

    /// A message with a modifier applied to the reply before sending.
    pub fn message_with(
        text: ResponseText,
        modifier: impl FnOnce(&mut OutboundReply) + Send + 'static,
    ) -> Self {
        Self::Message {
            text,
            modifier: Some(Box::new(modifier)),
        }
    }
}

/// Resolves a handler response into exactly one terminal reply or deferral.
#[derive(Clone)]
pub struct ResponseResolver {
    locales: Arc<LocaleSettings>,
}

impl ResponseResolver {
    pub fn new(locales: Arc<LocaleSettings>) -> Self {
        Self { locales }
    }

    /// Drive a response to its terminal form and deliver it.
    ///
    /// `None` defers acknowledgement with default visibility. Pending
    /// futures are awaited and their results re-resolved; the loop produces
    /// one send no matter how deep the nesting.
    pub async fn resolve(
        &self,
        response: Option<Response>,
        surface: &dyn ReplySurface,
        locale: &str,
        command: &str,
    ) {
        let mut current = response;
        loop {
            match current {
                None => {
                    self.deliver_defer(surface, false, command).await;
                    return;
                }
                Some(Response::Defer { ephemeral }) => {
                    self.deliver_defer(surface, ephemeral, command).await;
                    return;
                }
                Some(Response::Pending(future)) => {
                    current = Some(future.await);
                }
                Some(Response::Text(content)) => {
                    self.deliver(surface, OutboundReply::text(content), command)
                        .await;
                    return;
                }
                Some(Response::Message { text, modifier }) => {
                    let content = match text {
                        ResponseText::Literal(content) => content,
                        ResponseText::Localized { key } => {
                            self.locales.render(&key, locale).unwrap_or(key)
                        }
                    };
                    let mut reply = OutboundReply::text(content);
                    if let Some(modifier) = modifier {
                        modifier(&mut reply);
                    }
                    self.deliver(surface, reply, command).await;
                    return;
                }
            }
        }
    }

    async fn deliver(&self, surface: &dyn ReplySurface, reply: OutboundReply, command: &str) {
        match surface.send(reply).await {
            Ok(()) => {}
            Err(ReplyError::Expired) => {
                debug!(command, "reply window expired, dropping response");
            }
            Err(err) => {
                warn!(command, error = %err, "failed to deliver reply");
            }
        }
    }

    async fn deliver_defer(&self, surface: &dyn ReplySurface, ephemeral: bool, command: &str) {
        match surface.defer(ephemeral).await {
            Ok(()) => {}
            Err(ReplyError::Expired) => {
                debug!(command, "reply window expired, dropping deferral");
            }
            Err(err) => {
                warn!(command, error = %err, "failed to defer acknowledgement");
            }
        }
    }
}
