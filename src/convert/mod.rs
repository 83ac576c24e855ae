//! Typed value conversion
//!
//! A [`Converter`] is one directed edge in the conversion graph: it declares
//! an input and output [`TypeTag`] and turns a runtime [`Value`] of the
//! input type into one of the output type. Chain permissions are asymmetric:
//! `can_convert_to` allows a converter's output to feed a further converter,
//! `can_convert_from` allows it to accept input produced by another
//! converter. The [`ConverterRegistry`] resolves direct edges and discovers
//! multi-step chains.

pub mod builtin;
pub mod chain;
pub mod registry;

pub use self::chain::ChainConverter;
pub use self::registry::ConverterRegistry;

use async_trait::async_trait;

use crate::error::EngineResult;
use crate::event::InboundEvent;
use crate::i18n::LocaleSettings;
use crate::value_objects::{TypeTag, Value};

/// Ambient context available to a conversion.
///
/// Detached contexts (no event) exist only outside request handling;
/// contextual converters require an event and fail internally without one.
pub struct ConversionContext<'a> {
    event: Option<&'a dyn InboundEvent>,
    locales: &'a LocaleSettings,
}

impl<'a> ConversionContext<'a> {
    /// Context for a live invocation.
    pub fn new(event: &'a dyn InboundEvent, locales: &'a LocaleSettings) -> Self {
        Self {
            event: Some(event),
            locales,
        }
    }

    /// Context with no originating event.
    pub fn detached(locales: &'a LocaleSettings) -> Self {
        Self {
            event: None,
            locales,
        }
    }

    /// The originating event, or an internal error when detached.
    pub fn event(&self) -> EngineResult<&'a dyn InboundEvent> {
        self.event
            .ok_or_else(|| anyhow::anyhow!("contextual conversion outside an invocation").into())
    }

    pub fn locales(&self) -> &LocaleSettings {
        self.locales
    }
}

/// One directed, typed conversion edge.
///
/// A converter instance is shared read-only by every invocation that binds
/// to it and must be pure or internally synchronized. User-facing validation
/// failures are raised as [`crate::error::UserError`], never signaled with a
/// placeholder value.
#[async_trait]
pub trait Converter: Send + Sync {
    /// Declared input type.
    fn input_type(&self) -> TypeTag;

    /// Declared output type.
    fn output_type(&self) -> TypeTag;

    /// Whether the output may be handed on to a further converter.
    fn can_convert_to(&self) -> bool {
        true
    }

    /// Whether this converter accepts input produced by another converter.
    fn can_convert_from(&self) -> bool {
        true
    }

    /// Perform the conversion.
    async fn convert(&self, ctx: &ConversionContext<'_>, input: Value) -> EngineResult<Value>;
}

/// Pass-through converter for `input type == output type`.
///
/// Exists implicitly for every tag; the registry returns it without
/// consulting the registered edge set.
pub struct IdentityConverter {
    tag: TypeTag,
}

impl IdentityConverter {
    pub fn new(tag: TypeTag) -> Self {
        Self { tag }
    }
}

#[async_trait]
impl Converter for IdentityConverter {
    fn input_type(&self) -> TypeTag {
        self.tag
    }

    fn output_type(&self) -> TypeTag {
        self.tag
    }

    async fn convert(&self, _ctx: &ConversionContext<'_>, input: Value) -> EngineResult<Value> {
        Ok(input)
    }
}
