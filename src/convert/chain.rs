//! Composite converter over a discovered path

use async_trait::async_trait;
use std::sync::Arc;

use crate::convert::{ConversionContext, Converter};
use crate::error::EngineResult;
use crate::value_objects::{TypeTag, Value};

/// An ordered sequence of converters bridging two types with no direct edge.
///
/// Built once when the registry discovers a path; the composite is then
/// shared like any atomic converter and never re-derived per call.
pub struct ChainConverter {
    steps: Vec<Arc<dyn Converter>>,
}

impl ChainConverter {
    /// Build a chain from an ordered path of edges.
    ///
    /// Callers guarantee each step's output is compatible with the next
    /// step's input; the registry's search upholds this.
    pub(crate) fn new(steps: Vec<Arc<dyn Converter>>) -> Self {
        debug_assert!(steps.len() >= 2, "a chain needs at least two steps");
        Self { steps }
    }

    /// Number of edges in the chain.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[async_trait]
impl Converter for ChainConverter {
    fn input_type(&self) -> TypeTag {
        self.steps.first().map(|s| s.input_type()).unwrap_or(TypeTag::None)
    }

    fn output_type(&self) -> TypeTag {
        self.steps.last().map(|s| s.output_type()).unwrap_or(TypeTag::None)
    }

    fn can_convert_to(&self) -> bool {
        self.steps.last().map(|s| s.can_convert_to()).unwrap_or(false)
    }

    fn can_convert_from(&self) -> bool {
        self.steps.first().map(|s| s.can_convert_from()).unwrap_or(false)
    }

    async fn convert(&self, ctx: &ConversionContext<'_>, input: Value) -> EngineResult<Value> {
        let mut value = input;
        for step in &self.steps {
            value = step.convert(ctx, value).await?;
        }
        Ok(value)
    }
}
