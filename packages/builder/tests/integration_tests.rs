//! End-to-end tests over the assembled engine: store mutations flowing
//! through diffing and the render gate into the host tree.

use mediakit_builder::{
    DispatchOutcome, MediaKitBuilder, MoveTarget, RenderPhase, StaticRegistry,
};
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

fn init_logs() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn test_registry() -> Rc<StaticRegistry> {
    let mut registry = StaticRegistry::new();
    registry.register("hero", |props| {
        format!(
            "<div class=\"hero\"><h1>{}</h1></div>",
            props.get("title").and_then(serde_json::Value::as_str).unwrap_or("")
        )
    });
    registry.register("biography", |props| {
        format!(
            "<div class=\"bio\"><p>{}</p></div>",
            props.get("bio").and_then(serde_json::Value::as_str).unwrap_or("")
        )
    });
    registry.register("topics", |_| "<ul class=\"topics\"></ul>".to_string());
    Rc::new(registry)
}

fn builder() -> MediaKitBuilder {
    init_logs();
    MediaKitBuilder::new("integration-kit", test_registry())
}

#[tokio::test]
async fn test_add_move_remove_scenario() {
    let mut builder = builder();

    let c1 = builder.add_component("hero", json!({"title": "A"}), None);
    let c2 = builder.add_component("biography", json!({"bio": "B"}), None);
    assert_eq!(builder.state().layout, vec![c1.clone(), c2.clone()]);

    builder.move_component(c1.clone(), MoveTarget::Down);
    assert_eq!(builder.state().layout, vec![c2.clone(), c1.clone()]);

    builder.remove_component(c2);
    assert_eq!(builder.state().layout, vec![c1.clone()]);

    builder.flush().await;
    assert_eq!(builder.tree().component_count(), 1);
    assert!(builder.tree().component_node(c1.as_str()).is_some());
}

#[tokio::test]
async fn test_empty_state_signal_has_no_stale_window() {
    let builder = Rc::new(RefCell::new(builder()));

    // A synchronous listener must observe has_content agreeing with the
    // next snapshot at every single notification.
    let observed: Rc<RefCell<Vec<(bool, bool)>>> = Rc::new(RefCell::new(Vec::new()));
    {
        let observed = observed.clone();
        builder
            .borrow()
            .subscribe(move |_, next| {
                observed
                    .borrow_mut()
                    .push((next.has_content(), !next.components.is_empty()));
            });
    }

    let id = builder.borrow_mut().add_component("hero", json!({}), None);
    assert!(builder.borrow().has_content());

    builder.borrow_mut().remove_component(id);
    assert!(!builder.borrow().has_content());

    for (signal, truth) in observed.borrow().iter() {
        assert_eq!(signal, truth);
    }
    assert_eq!(observed.borrow().len(), 2);
}

#[tokio::test]
async fn test_empty_state_node_tracks_content() {
    let mut builder = builder();
    builder.initialize(None).await;
    assert!(builder.tree().empty_state_visible());

    let id = builder.add_component("hero", json!({}), None);
    builder.flush().await;
    assert!(!builder.tree().empty_state_visible());

    builder.remove_component(id);
    builder.flush().await;
    assert!(builder.tree().empty_state_visible());
    assert_eq!(builder.tree().component_count(), 0);
}

#[tokio::test]
async fn test_unknown_id_removal_is_safe() {
    let mut builder = builder();
    builder.add_component("hero", json!({}), None);

    let outcome = builder.remove_component("does-not-exist");
    assert!(matches!(outcome, DispatchOutcome::Ignored(_)));
    assert_eq!(builder.state().components.len(), 1);

    builder.flush().await;
    assert_eq!(builder.tree().component_count(), 1);
}

#[tokio::test]
async fn test_mount_is_idempotent_across_redundant_triggers() {
    let mut builder = builder();
    let id = builder.add_component("hero", json!({"title": "A"}), None);
    builder.update_component(id.clone(), json!({"title": "B"}));
    builder.update_component(id.clone(), json!({"title": "C"}));

    // Three notifications queued, plus forced re-renders sprinkled in.
    builder.flush().await;
    builder.force_render().await;
    builder.force_render().await;
    builder.flush().await;

    assert_eq!(builder.tree().component_count(), 1);
    assert_eq!(
        builder.tree().component_node(id.as_str()).unwrap().markup,
        "<div class=\"hero\"><h1>C</h1></div>"
    );
}

#[tokio::test]
async fn test_move_permutations_match_layout_order() {
    let mut builder = builder();
    let a = builder.add_component("hero", json!({}), None);
    let b = builder.add_component("biography", json!({}), None);
    let c = builder.add_component("topics", json!({}), None);
    let d = builder.add_component("hero", json!({}), None);

    builder.move_component(a.clone(), MoveTarget::Down);
    builder.move_component(d.clone(), MoveTarget::Index(0));
    builder.move_component(b.clone(), MoveTarget::Up);
    builder.move_component(c.clone(), MoveTarget::Index(2));
    builder.move_component(d.clone(), MoveTarget::Down);

    builder.flush().await;

    let layout = builder.state().layout;
    assert_eq!(builder.tree().component_order(), layout);
    assert_eq!(builder.tree().component_count(), 4);
}

#[tokio::test]
async fn test_update_patches_in_place_without_remount() {
    let mut builder = builder();
    let id = builder.add_component("hero", json!({"title": "A"}), None);
    builder.flush().await;

    let events: Rc<RefCell<Vec<RenderPhase>>> = Rc::new(RefCell::new(Vec::new()));
    {
        let events = events.clone();
        builder.on_render_complete(move |event| {
            events.borrow_mut().push(event.phase);
        });
    }

    builder.update_component(id.clone(), json!({"title": "B"}));
    builder.flush().await;

    assert_eq!(events.borrow().as_slice(), &[RenderPhase::Updated]);
    assert_eq!(builder.tree().component_count(), 1);
    assert!(builder
        .tree()
        .component_node(id.as_str())
        .unwrap()
        .markup
        .contains("B"));
}

#[tokio::test]
async fn test_missing_renderer_produces_visible_placeholder() {
    let mut builder = builder();
    let id = builder.add_component("calendar", json!({}), None);
    builder.flush().await;

    let node = builder.tree().component_node(id.as_str()).unwrap();
    assert!(node.markup.contains("mk-component--fallback"));
    assert!(node.markup.contains("calendar"));
}

#[tokio::test]
async fn test_undo_redo_reconciles_the_tree() {
    let mut builder = builder();
    let id = builder.add_component("hero", json!({}), None);
    builder.flush().await;
    assert_eq!(builder.tree().component_count(), 1);

    assert!(builder.undo());
    builder.flush().await;
    assert_eq!(builder.tree().component_count(), 0);
    assert!(builder.tree().empty_state_visible());

    assert!(builder.redo());
    builder.flush().await;
    assert_eq!(builder.tree().component_count(), 1);
    assert!(builder.tree().component_node(id.as_str()).is_some());
}

#[tokio::test]
async fn test_batch_applies_atomically_with_one_notification() {
    let mut builder = builder();
    let notifications = Rc::new(RefCell::new(0usize));
    {
        let notifications = notifications.clone();
        builder.subscribe(move |_, _| {
            *notifications.borrow_mut() += 1;
        });
    }

    builder.begin_batch();
    builder.add_component("hero", json!({}), None);
    builder.add_component("biography", json!({}), None);
    builder.add_component("topics", json!({}), None);
    assert_eq!(*notifications.borrow(), 0);

    let outcome = builder.end_batch();
    assert!(outcome.is_applied());
    assert_eq!(*notifications.borrow(), 1);

    builder.flush().await;
    assert_eq!(builder.tree().component_count(), 3);

    // The whole batch is one undo step.
    assert!(builder.undo());
    builder.flush().await;
    assert_eq!(builder.tree().component_count(), 0);
}

#[tokio::test]
async fn test_render_complete_fires_once_per_mount() {
    let mut builder = builder();
    let mounted: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
    {
        let mounted = mounted.clone();
        builder.on_render_complete(move |event| {
            if event.phase == RenderPhase::Mounted {
                mounted.borrow_mut().push(event.id.clone());
            }
        });
    }

    let a = builder.add_component("hero", json!({}), None);
    let b = builder.add_component("biography", json!({}), None);
    builder.flush().await;
    builder.force_render().await;

    let mounted = mounted.borrow();
    assert_eq!(mounted.len(), 2);
    assert!(mounted.contains(&a.to_string()));
    assert!(mounted.contains(&b.to_string()));
}

#[tokio::test]
async fn test_settings_updates_do_not_touch_the_tree() {
    let mut builder = builder();
    builder.add_component("hero", json!({}), None);
    builder.flush().await;

    builder.update_settings(json!({"theme": "midnight"}));
    builder.flush().await;

    assert_eq!(builder.state().settings, json!({"theme": "midnight"}));
    assert_eq!(builder.tree().component_count(), 1);
}
