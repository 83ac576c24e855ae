//! Converter registry and chain discovery
//!
//! The registry owns every registered conversion edge. Resolution is
//! two-tiered: [`ConverterRegistry::get_converter`] answers identity, exact,
//! and widening matches; [`ConverterRegistry::find_converter`] adds a
//! breadth-first search that composes registered edges into a
//! [`ChainConverter`] when no direct edge exists. Resolution happens at
//! compile time only — a missing path is a compile error, never a
//! request-time condition.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use crate::convert::{ChainConverter, Converter, IdentityConverter};
use crate::value_objects::TypeTag;

/// Owner of all conversion edges, shared read-only after startup.
#[derive(Default)]
pub struct ConverterRegistry {
    edges: Vec<Arc<dyn Converter>>,
}

impl ConverterRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-populated with the built-in converter set.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::convert::builtin::register_builtins(&mut registry);
        registry
    }

    /// Register one conversion edge. Registration order is significant:
    /// earlier edges win widening matches and search ties.
    pub fn register(&mut self, converter: Arc<dyn Converter>) {
        self.edges.push(converter);
    }

    /// Number of registered edges.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Resolve a direct converter: identity, exact edge, or widening edge.
    pub fn get_converter(&self, input: TypeTag, output: TypeTag) -> Option<Arc<dyn Converter>> {
        if input == output {
            return Some(Arc::new(IdentityConverter::new(input)));
        }
        if let Some(exact) = self
            .edges
            .iter()
            .find(|e| e.input_type() == input && e.output_type() == output)
        {
            return Some(Arc::clone(exact));
        }
        self.edges
            .iter()
            .find(|e| e.input_type().accepts(input) && output.accepts(e.output_type()))
            .map(Arc::clone)
    }

    /// Resolve a converter, composing a chain when no direct edge exists.
    ///
    /// Breadth-first over the edge graph: the shortest chain wins, with ties
    /// broken by registration order at the shallowest level. A path never
    /// reuses an edge and never produces a type it has already passed
    /// through, so search terminates on cyclic graphs.
    pub fn find_converter(&self, input: TypeTag, output: TypeTag) -> Option<Arc<dyn Converter>> {
        if let Some(direct) = self.get_converter(input, output) {
            return Some(direct);
        }

        // Frontier of edge-index paths, expanded one level per round.
        let mut frontier: Vec<Vec<usize>> = self
            .edges
            .iter()
            .enumerate()
            .filter(|(_, e)| e.input_type().accepts(input))
            .map(|(i, _)| vec![i])
            .collect();

        while !frontier.is_empty() {
            for path in &frontier {
                let tail = &self.edges[*path.last().unwrap()];
                if output.accepts(tail.output_type()) {
                    return Some(self.materialize(path, input, output));
                }
            }

            let mut next = Vec::new();
            for path in &frontier {
                let tail = &self.edges[*path.last().unwrap()];
                if !tail.can_convert_to() {
                    continue;
                }
                let mut produced: HashSet<TypeTag> = HashSet::with_capacity(path.len() + 1);
                produced.insert(input);
                for &i in path {
                    produced.insert(self.edges[i].output_type());
                }
                for (i, edge) in self.edges.iter().enumerate() {
                    if path.contains(&i) {
                        continue;
                    }
                    if !edge.can_convert_from() {
                        continue;
                    }
                    if !edge.input_type().accepts(tail.output_type()) {
                        continue;
                    }
                    if produced.contains(&edge.output_type()) {
                        continue;
                    }
                    let mut extended = path.clone();
                    extended.push(i);
                    next.push(extended);
                }
            }
            frontier = next;
        }

        None
    }

    fn materialize(&self, path: &[usize], input: TypeTag, output: TypeTag) -> Arc<dyn Converter> {
        if path.len() == 1 {
            return Arc::clone(&self.edges[path[0]]);
        }
        debug!(
            from = ?input,
            to = ?output,
            steps = path.len(),
            "composed converter chain"
        );
        let steps = path.iter().map(|&i| Arc::clone(&self.edges[i])).collect();
        Arc::new(ChainConverter::new(steps))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::ConversionContext;
    use crate::error::EngineResult;
    use crate::i18n::{LocaleSettings, StaticTranslations};
    use crate::value_objects::Value;
    use async_trait::async_trait;

    /// Test edge mapping one tag to another with configurable chain flags.
    struct Edge {
        input: TypeTag,
        output: TypeTag,
        to: bool,
        from: bool,
    }

    impl Edge {
        fn new(input: TypeTag, output: TypeTag) -> Arc<dyn Converter> {
            Arc::new(Self {
                input,
                output,
                to: true,
                from: true,
            })
        }

        fn flags(input: TypeTag, output: TypeTag, to: bool, from: bool) -> Arc<dyn Converter> {
            Arc::new(Self { input, output, to, from })
        }
    }

    #[async_trait]
    impl Converter for Edge {
        fn input_type(&self) -> TypeTag {
            self.input
        }

        fn output_type(&self) -> TypeTag {
            self.output
        }

        fn can_convert_to(&self) -> bool {
            self.to
        }

        fn can_convert_from(&self) -> bool {
            self.from
        }

        async fn convert(&self, _ctx: &ConversionContext<'_>, input: Value) -> EngineResult<Value> {
            // Tag the value's journey so composition order is observable.
            let trace = match input {
                Value::String(s) => s,
                other => format!("{:?}", other.tag()),
            };
            Ok(Value::String(format!("{}>{:?}", trace, self.output)))
        }
    }

    fn locales() -> LocaleSettings {
        LocaleSettings::new(Arc::new(StaticTranslations::new()), "en-US")
    }

    #[test]
    fn test_identity_without_consulting_registry() {
        let registry = ConverterRegistry::new();
        let converter = registry.find_converter(TypeTag::String, TypeTag::String).unwrap();
        assert_eq!(converter.input_type(), TypeTag::String);
        assert_eq!(converter.output_type(), TypeTag::String);
    }

    #[test]
    fn test_exact_edge_preferred() {
        let mut registry = ConverterRegistry::new();
        registry.register(Edge::new(TypeTag::String, TypeTag::Integer));
        let converter = registry.get_converter(TypeTag::String, TypeTag::Integer).unwrap();
        assert_eq!(converter.output_type(), TypeTag::Integer);
    }

    #[test]
    fn test_widening_match() {
        let mut registry = ConverterRegistry::new();
        registry.register(Edge::new(TypeTag::String, TypeTag::Integer));
        // Number accepts Integer output, so the edge satisfies String -> Number.
        let converter = registry.get_converter(TypeTag::String, TypeTag::Number).unwrap();
        assert_eq!(converter.output_type(), TypeTag::Integer);
    }

    #[tokio::test]
    async fn test_two_step_chain_composes_in_order() {
        let mut registry = ConverterRegistry::new();
        registry.register(Edge::new(TypeTag::String, TypeTag::Duration));
        registry.register(Edge::new(TypeTag::Duration, TypeTag::Timestamp));

        let converter = registry
            .find_converter(TypeTag::String, TypeTag::Timestamp)
            .unwrap();
        assert_eq!(converter.input_type(), TypeTag::String);
        assert_eq!(converter.output_type(), TypeTag::Timestamp);

        let locales = locales();
        let ctx = ConversionContext::detached(&locales);
        let result = converter
            .convert(&ctx, Value::String("x".to_string()))
            .await
            .unwrap();
        assert_eq!(result, Value::String("x>Duration>Timestamp".to_string()));
    }

    #[test]
    fn test_cycle_does_not_loop() {
        let mut registry = ConverterRegistry::new();
        registry.register(Edge::new(TypeTag::String, TypeTag::Integer));
        registry.register(Edge::new(TypeTag::Integer, TypeTag::String));
        registry.register(Edge::new(TypeTag::Integer, TypeTag::Duration));

        // Must terminate and pick A then C, never looping through B.
        let converter = registry
            .find_converter(TypeTag::String, TypeTag::Duration)
            .unwrap();
        assert_eq!(converter.input_type(), TypeTag::String);
        assert_eq!(converter.output_type(), TypeTag::Duration);
    }

    #[test]
    fn test_chain_flags_block_composition() {
        let mut registry = ConverterRegistry::new();
        registry.register(Edge::flags(TypeTag::String, TypeTag::Integer, false, true));
        registry.register(Edge::new(TypeTag::Integer, TypeTag::Duration));
        assert!(registry.find_converter(TypeTag::String, TypeTag::Duration).is_none());

        let mut registry = ConverterRegistry::new();
        registry.register(Edge::new(TypeTag::String, TypeTag::Integer));
        registry.register(Edge::flags(TypeTag::Integer, TypeTag::Duration, true, false));
        assert!(registry.find_converter(TypeTag::String, TypeTag::Duration).is_none());
    }

    #[tokio::test]
    async fn test_shortest_chain_wins() {
        let mut registry = ConverterRegistry::new();
        // Long route registered first: String -> Integer -> Number -> Boolean
        registry.register(Edge::new(TypeTag::String, TypeTag::Integer));
        registry.register(Edge::new(TypeTag::Integer, TypeTag::Number));
        registry.register(Edge::new(TypeTag::Number, TypeTag::Boolean));
        // Short route: String -> Duration -> Boolean
        registry.register(Edge::new(TypeTag::String, TypeTag::Duration));
        registry.register(Edge::new(TypeTag::Duration, TypeTag::Boolean));

        let converter = registry
            .find_converter(TypeTag::String, TypeTag::Boolean)
            .unwrap();
        assert_eq!(converter.input_type(), TypeTag::String);
        assert_eq!(converter.output_type(), TypeTag::Boolean);

        // The trace shows two hops, not the three-step detour.
        let locales = locales();
        let ctx = ConversionContext::detached(&locales);
        let result = converter
            .convert(&ctx, Value::String("x".to_string()))
            .await
            .unwrap();
        assert_eq!(result, Value::String("x>Duration>Boolean".to_string()));
    }

    #[test]
    fn test_no_path_returns_none() {
        let mut registry = ConverterRegistry::new();
        registry.register(Edge::new(TypeTag::String, TypeTag::Integer));
        assert!(registry.find_converter(TypeTag::Boolean, TypeTag::User).is_none());
    }
}
