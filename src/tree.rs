//! Deterministic hierarchical traversal of the body forest.
//!
//! The ADF document lists bodies parents-first so that a reader (human or
//! loader) always meets a parent before its descendants. The order is
//! independent of the scene's internal storage order: every node is walked up
//! to its root ancestor, then each root's subtree is visited depth-first
//! preorder, with a visited set guaranteeing each body appears exactly once
//! no matter how many starting nodes share a root.

use crate::scene::{BodyId, SceneGraph};

/// Bodies of `scene` in deterministic parents-first order.
pub fn hierarchical_order(scene: &SceneGraph) -> Vec<BodyId> {
    let mut visited = vec![false; scene.len()];
    let mut order = Vec::with_capacity(scene.len());

    for id in scene.ids() {
        let root = scene.root_of(id);
        downward_pass(scene, root, &mut visited, &mut order);
    }

    order
}

fn downward_pass(scene: &SceneGraph, id: BodyId, visited: &mut [bool], order: &mut Vec<BodyId>) {
    if visited[id as usize] {
        return;
    }
    visited[id as usize] = true;
    order.push(id);

    for child in scene.children_of(id) {
        downward_pass(scene, child, visited, order);
    }
}
