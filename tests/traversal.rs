// tests/traversal.rs
use adf_bridge::tree::hierarchical_order;
use adf_bridge::{Body, BodyId, SceneGraph};

// Bodies are inserted children-first on purpose: the traversal must not
// depend on storage order.
fn scrambled_forest() -> SceneGraph {
    let mut scene = SceneGraph::new();
    let leaf = scene.add_body(Body::placeholder("leaf"));
    let lone = scene.add_body(Body::placeholder("lone"));
    let mid = scene.add_body(Body::placeholder("mid"));
    let root = scene.add_body(Body::placeholder("root"));
    let sibling = scene.add_body(Body::placeholder("sibling"));

    scene.body_mut(leaf).parent = Some(mid);
    scene.body_mut(mid).parent = Some(root);
    scene.body_mut(sibling).parent = Some(root);
    let _ = lone;
    scene
}

fn position(order: &[BodyId], id: BodyId) -> usize {
    order.iter().position(|&o| o == id).expect("body missing from order")
}

#[test]
fn every_body_appears_exactly_once() {
    let scene = scrambled_forest();
    let order = hierarchical_order(&scene);

    assert_eq!(order.len(), scene.len());
    let mut sorted = order.clone();
    sorted.sort_unstable();
    sorted.dedup();
    assert_eq!(sorted.len(), scene.len(), "order must not repeat bodies");
}

#[test]
fn parents_precede_their_descendants() {
    let scene = scrambled_forest();
    let order = hierarchical_order(&scene);

    for (id, body) in scene.bodies() {
        if let Some(parent) = body.parent {
            assert!(
                position(&order, parent) < position(&order, id),
                "parent {parent} must precede child {id}"
            );
        }
    }
}

#[test]
fn multiple_roots_are_all_visited() {
    let scene = scrambled_forest();
    let order = hierarchical_order(&scene);

    let root = scene.find_by_name("root").unwrap();
    let lone = scene.find_by_name("lone").unwrap();
    assert!(order.contains(&root));
    assert!(order.contains(&lone));
}

#[test]
fn traversal_is_deterministic() {
    let scene = scrambled_forest();
    assert_eq!(hierarchical_order(&scene), hierarchical_order(&scene));
}
