//! Property-based invariant tests for history, the event bus and the result cache
//!
//! 1. History never exceeds its cap; the cursor keeps naming the same snapshot.
//! 2. Saving after an undo leaves nothing to redo.
//! 3. Undo then redo returns to the same snapshot.
//! 4. Owner teardown removes exactly the owner's listeners.
//! 5. A cached result is returned iff it was stored less than `ttl` ago.

use proptest::prelude::*;
use serde_json::Value;
use thinkmap::llm::{LlmResultCache, ModelOutcome};
use thinkmap::{
    CacheConfig, DiagramSpec, EditorError, EditorEvent, EventBus, FlowMapSpec, HistoryStack,
    SpecBody,
};

// ── Helpers ─────────────────────────────────────────────────────────────

fn flow(n: usize) -> DiagramSpec {
    DiagramSpec::new(SpecBody::FlowMap(FlowMapSpec {
        title: format!("S{}", n),
        ..Default::default()
    }))
}

fn title(spec: &DiagramSpec) -> String {
    spec.body.root_field("title").unwrap_or_default().to_string()
}

fn filled(cap: usize, pushes: usize) -> HistoryStack {
    let mut stack = HistoryStack::new(cap);
    for n in 0..pushes {
        stack.push("update_node", Value::Null, &flow(n));
    }
    stack
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Cap and cursor
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn history_respects_cap(cap in 1usize..20, pushes in 0usize..60, undos in 0usize..10) {
        let mut stack = filled(cap, pushes);
        for _ in 0..undos {
            stack.undo();
        }
        let named = stack.current().map(|e| title(&e.spec));

        stack.push("add_node", Value::Null, &flow(1000));

        prop_assert!(stack.len() <= cap);
        prop_assert_eq!(stack.current().map(|e| title(&e.spec)), Some("S1000".to_string()));
        if let (Some(named), Some(index)) = (named, stack.index()) {
            // The previous cursor is right before the new tail unless it was evicted
            if index > 0 {
                prop_assert_eq!(title(&stack.entries()[index - 1].spec), named);
            }
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Branch cut
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn save_after_undo_cuts_redo(pushes in 2usize..30, undos in 1usize..10) {
        let mut stack = filled(50, pushes);
        for _ in 0..undos {
            stack.undo();
        }
        stack.push("update_node", Value::Null, &flow(999));

        prop_assert!(!stack.can_redo());
        prop_assert_eq!(stack.index(), Some(stack.len() - 1));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Undo/redo round trip
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn undo_redo_round_trip(pushes in 1usize..30, steps in 0usize..10) {
        let mut stack = filled(50, pushes);
        let before = stack.current().map(|e| title(&e.spec));

        let mut undone = 0;
        for _ in 0..steps {
            if stack.undo().is_some() {
                undone += 1;
            }
        }
        for _ in 0..undone {
            prop_assert!(stack.redo().is_some());
        }

        prop_assert_eq!(stack.current().map(|e| title(&e.spec)), before);
        prop_assert!(!stack.can_redo());
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Owner teardown
// ═════════════════════════════════════════════════════════════════════════

fn listeners_strategy() -> impl Strategy<Value = Vec<(u8, Option<u8>)>> {
    prop::collection::vec((0u8..4, prop::option::of(0u8..3)), 0..30)
}

proptest! {
    #[test]
    fn owner_teardown_is_exact(listeners in listeners_strategy(), victim in 0u8..3) {
        let bus = EventBus::new();
        for (topic, owner) in &listeners {
            let topic = format!("topic:{}", topic);
            match owner {
                Some(owner) => {
                    bus.on_with_owner(&topic, &format!("owner{}", owner), |_| Ok(()));
                }
                None => {
                    bus.on(&topic, |_| Ok(()));
                }
            }
        }
        let owned = listeners.iter().filter(|(_, o)| *o == Some(victim)).count();
        let total: usize = (0u8..4).map(|t| bus.listener_count(&format!("topic:{}", t))).sum();

        let removed = bus.remove_all_listeners_for_owner(&format!("owner{}", victim));

        prop_assert_eq!(removed, owned);
        prop_assert_eq!(bus.owner_listener_count(&format!("owner{}", victim)), 0);
        let left: usize = (0u8..4).map(|t| bus.listener_count(&format!("topic:{}", t))).sum();
        prop_assert_eq!(left, total - owned);
        let delivered = bus.emit(EditorEvent::Custom { topic: "topic:0".to_string(), payload: Value::Null });
        prop_assert_eq!(delivered, bus.listener_count("topic:0"));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Cache freshness
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn cache_retrieve_iff_fresh(ttl in 1u64..1_000_000, stored in 0u64..1_000_000, age in 0u64..2_000_000) {
        let mut cache = LlmResultCache::new(&CacheConfig { ttl_ms: ttl, max_results: 5 });
        let outcome = ModelOutcome::failed("qwen", EditorError::generation_failed("x"), 0.0);
        cache.store_at("qwen", outcome, stored);

        let hit = cache.retrieve_at("qwen", stored + age).is_some();

        prop_assert_eq!(hit, age < ttl);
        prop_assert!(cache.retrieve_at("kimi", stored + age).is_none());
    }
}
