//! Operation registry: routes mutations to the module for the active type
//!
//! The diagram type is always read from the [`StateStore`] at call time, so
//! a type switch between two calls is picked up without re-wiring anything.

use std::collections::HashMap;

use tracing::{debug, info, span, warn, Level};

use super::bridge_map::BridgeMapOperations;
use super::concept_map::ConceptMapOperations;
use super::generic::TableOperations;
use super::shape::shapes;
use super::{DiagramOperations, OperationContext, OperationOutcome};
use crate::core::{DiagramSpec, DiagramType, EditorError, StateStore};

/// Registry of per-type operation modules
#[derive(Default)]
pub struct OperationRegistry {
    modules: HashMap<DiagramType, Box<dyn DiagramOperations>>,
}

impl OperationRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with a module for every diagram type
    pub fn with_all_plugins() -> Self {
        let mut registry = Self::new();
        for shape in shapes() {
            registry.register(Box::new(TableOperations::new(shape)));
        }
        registry.register(Box::new(BridgeMapOperations::new()));
        registry.register(Box::new(ConceptMapOperations::new()));
        debug!(count = registry.modules.len(), "Registered operation modules");
        registry
    }

    /// Register a module, replacing any previous one for the same type
    pub fn register(&mut self, module: Box<dyn DiagramOperations>) {
        self.modules.insert(module.diagram_type(), module);
    }

    pub fn get(&self, diagram_type: DiagramType) -> Option<&dyn DiagramOperations> {
        self.modules.get(&diagram_type).map(|m| m.as_ref())
    }

    pub fn has(&self, diagram_type: DiagramType) -> bool {
        self.modules.contains_key(&diagram_type)
    }

    /// Registered types in canonical order
    pub fn supported_types(&self) -> Vec<DiagramType> {
        DiagramType::ALL
            .iter()
            .copied()
            .filter(|t| self.has(*t))
            .collect()
    }

    /// Module for the active diagram in `store`
    pub fn active(&self, store: &StateStore) -> Result<&dyn DiagramOperations, EditorError> {
        let diagram_type = store
            .diagram_type()
            .ok_or_else(|| EditorError::rejected("No active diagram"))?;
        self.get(diagram_type)
            .ok_or_else(|| EditorError::UnknownDiagramType {
                diagram_type: diagram_type.to_string(),
            })
    }

    /// Run one mutation against the active spec and write the result back
    ///
    /// The spec is cloned out of the store before the module runs. Events the
    /// module publishes through `ctx` are held until the new spec is in the
    /// store, so listeners always read the post-operation state.
    pub fn apply<F>(
        &self,
        store: &StateStore,
        operation: &str,
        ctx: &OperationContext<'_>,
        f: F,
    ) -> Result<OperationOutcome, EditorError>
    where
        F: FnOnce(
            &dyn DiagramOperations,
            &mut DiagramSpec,
            &OperationContext<'_>,
        ) -> OperationOutcome,
    {
        let apply_span = span!(Level::INFO, "apply_operation", operation);
        let _enter = apply_span.enter();

        let module = self.active(store)?;
        let Some(mut spec) = store.get_diagram_state().spec else {
            warn!("Active diagram has no spec");
            return Err(EditorError::rejected("No active diagram"));
        };

        ctx.hold();
        let outcome = f(module, &mut spec, ctx);
        if outcome.is_applied() {
            store.set_diagram(spec);
            info!(diagram_type = %module.diagram_type(), "Operation applied");
        } else {
            debug!(?outcome, "Operation did not change the spec");
        }
        let delivered = ctx.release();
        debug!(delivered, "Operation events published");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use crate::core::{
        topics, BubbleMapSpec, EventBus, FlowMapSpec, Language, NodeIndex, RenderedNode, SpecBody,
    };

    #[test]
    fn test_all_types_registered() {
        let registry = OperationRegistry::with_all_plugins();
        assert_eq!(registry.supported_types(), DiagramType::ALL.to_vec());
    }

    #[test]
    fn test_active_requires_diagram() {
        let registry = OperationRegistry::with_all_plugins();
        let store = StateStore::new();
        assert!(matches!(
            registry.active(&store),
            Err(EditorError::OperationRejected { .. })
        ));
    }

    #[test]
    fn test_apply_follows_type_switch() {
        let registry = OperationRegistry::with_all_plugins();
        let store = StateStore::new();
        let bus = EventBus::new();
        let doc = NodeIndex::new();
        let ctx = OperationContext::new(&bus, &doc, Language::En);
        store.set_diagram(DiagramSpec::new(SpecBody::BubbleMap(BubbleMapSpec {
            topic: "T".into(),
            ..Default::default()
        })));

        let add = |module: &dyn DiagramOperations, spec: &mut DiagramSpec, ctx: &OperationContext<'_>| {
            module.add_node(spec, ctx)
        };

        assert!(registry.apply(&store, "add_node", &ctx, add).unwrap().is_applied());
        let spec = store.get_diagram_state().spec.unwrap();
        assert_eq!(spec.body.list("attributes").unwrap().len(), 1);

        store.set_diagram(DiagramSpec::new(SpecBody::FlowMap(FlowMapSpec {
            title: "Steps".into(),
            ..Default::default()
        })));
        assert!(registry.apply(&store, "add_node", &ctx, add).unwrap().is_applied());
        let spec = store.get_diagram_state().spec.unwrap();
        assert_eq!(spec.body.list("steps").unwrap().text_at(0), Some("New Step"));
    }

    #[test]
    fn test_listeners_read_written_back_spec() {
        let registry = OperationRegistry::with_all_plugins();
        let store = Arc::new(StateStore::new());
        let bus = EventBus::new();
        let doc = NodeIndex::new();
        let ctx = OperationContext::new(&bus, &doc, Language::En);
        store.set_diagram(DiagramSpec::new(SpecBody::BubbleMap(BubbleMapSpec {
            topic: "T".into(),
            attributes: vec!["A".into()],
            ..Default::default()
        })));

        let seen = Arc::new(Mutex::new(Vec::new()));
        for topic in [topics::NODE_ADDED, topics::OPERATION_COMPLETED] {
            let seen = seen.clone();
            let store = store.clone();
            bus.on(topic, move |_| {
                let spec = store.get_diagram_state().spec.unwrap();
                seen.lock().unwrap().push(spec.body.list("attributes").unwrap().len());
                Ok(())
            });
        }

        let outcome = registry
            .apply(&store, "add_node", &ctx, |module, spec, ctx| module.add_node(spec, ctx))
            .unwrap();

        assert!(outcome.is_applied());
        assert_eq!(*seen.lock().unwrap(), vec![2, 2]);
    }

    #[test]
    fn test_apply_releases_warnings_when_rejected() {
        let registry = OperationRegistry::with_all_plugins();
        let store = StateStore::new();
        let bus = EventBus::new();
        let warnings = Arc::new(Mutex::new(0));
        let sink = warnings.clone();
        bus.on(topics::OPERATION_WARNING, move |_| {
            *sink.lock().unwrap() += 1;
            Ok(())
        });
        let doc = NodeIndex::new().with_node(RenderedNode::new("topic", "topic"));
        let ctx = OperationContext::new(&bus, &doc, Language::En);
        let original = DiagramSpec::new(SpecBody::BubbleMap(BubbleMapSpec {
            topic: "T".into(),
            ..Default::default()
        }));
        store.set_diagram(original.clone());

        let ids = vec!["topic".to_string()];
        let outcome = registry
            .apply(&store, "delete_nodes", &ctx, |module, spec, ctx| {
                module.delete_nodes(spec, &ids, ctx)
            })
            .unwrap();

        assert!(matches!(outcome, OperationOutcome::Rejected { .. }));
        assert_eq!(*warnings.lock().unwrap(), 1);
        assert_eq!(store.get_diagram_state().spec, Some(original));
    }

    #[test]
    fn test_apply_leaves_store_on_noop() {
        let registry = OperationRegistry::with_all_plugins();
        let store = StateStore::new();
        let bus = EventBus::new();
        let doc = NodeIndex::new();
        let ctx = OperationContext::new(&bus, &doc, Language::En);
        let original = DiagramSpec::new(SpecBody::BubbleMap(BubbleMapSpec::default()));
        store.set_diagram(original.clone());
        let outcome = registry
            .apply(&store, "delete_nodes", &ctx, |_, _, _| OperationOutcome::NoOp)
            .unwrap();
        assert_eq!(outcome, OperationOutcome::NoOp);
        assert_eq!(store.get_diagram_state().spec, Some(original));
    }
}
