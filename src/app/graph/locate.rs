use eframe::egui::{Pos2, Vec2, vec2};

use crate::util::circle_contains;

use super::super::{GraphScene, NODE_RADIUS};

/// Nodes closer than this to each other are considered overlapping when
/// searching for a free slot.
pub(in crate::app) const MIN_NODE_SPACING: f32 = NODE_RADIUS * 5.0;

const SPIRAL_SPACING: f32 = 20.0;
const MAX_SPIRAL_STEPS: u32 = 10_000;

/// Evenly arc-spaced outward spiral of candidate offsets. The radius grows
/// with the square root of the step count while the angle advances by
/// `asin(1/radius)`, which keeps consecutive candidates roughly one unit of
/// arc apart. Ends after a fixed number of steps.
struct Spiral {
    step: u32,
    angle: f32,
}

impl Spiral {
    fn new() -> Self {
        Self {
            step: 0,
            angle: 1.0,
        }
    }
}

impl Iterator for Spiral {
    type Item = Vec2;

    fn next(&mut self) -> Option<Vec2> {
        if self.step >= MAX_SPIRAL_STEPS {
            return None;
        }

        let radius = ((self.step + 1) as f32).sqrt();
        self.angle += (1.0 / radius).asin();
        self.step += 1;

        Some(vec2(
            self.angle.cos() * radius * SPIRAL_SPACING,
            self.angle.sin() * radius * SPIRAL_SPACING,
        ))
    }
}

/// Assign a position to every unlocated node, in current array order.
///
/// After a node is placed, its unlocated incoming neighbors are processed
/// next (depth-first, via an explicit work stack) so connected clusters land
/// next to each other before the outer loop advances to the next
/// independent node.
pub(in crate::app) fn locate_all(scene: &mut GraphScene) {
    let center = Pos2::new(
        scene.canvas_rect.width() / 2.0,
        scene.canvas_rect.height() / 2.0,
    );

    let mut stack = Vec::new();
    for index in 0..scene.nodes.len() {
        if scene.nodes[index].pos.is_some() {
            continue;
        }

        stack.push(index);
        while let Some(current) = stack.pop() {
            if scene.nodes[current].pos.is_some() {
                continue;
            }

            locate_node(scene, current, center);

            let id = scene.nodes[current].id.clone();
            let Some(links) = scene.links.get(&id) else {
                continue;
            };

            // Reversed so the first incoming neighbor is placed first.
            let mut pending = links
                .incoming
                .iter()
                .filter_map(|from_id| scene.index_by_id.get(from_id).copied())
                .filter(|&neighbor| scene.nodes[neighbor].pos.is_none())
                .collect::<Vec<_>>();
            pending.reverse();
            stack.extend(pending);
        }
    }
}

/// Spiral-search a collision-free position for one node.
///
/// The search is anchored on the first located node this node points to, so
/// related nodes cluster; otherwise it starts from the drawing-area center.
/// Exhausting the spiral leaves the node unlocated, which downstream code
/// tolerates by skipping its draw.
fn locate_node(scene: &mut GraphScene, index: usize, center: Pos2) {
    if scene.nodes[index].pos.is_some() {
        log::error!(
            "node {} is already located, refusing to relocate",
            scene.nodes[index].id
        );
        return;
    }

    let anchor = anchor_for(scene, index).unwrap_or(center);

    let mut spiral = Spiral::new();
    let mut candidate = anchor;
    loop {
        if !collides(scene, index, candidate) {
            scene.nodes[index].pos = Some(candidate);
            return;
        }

        match spiral.next() {
            Some(offset) => candidate = anchor + offset,
            None => {
                log::warn!(
                    "no free slot for node {} after {MAX_SPIRAL_STEPS} spiral steps",
                    scene.nodes[index].id
                );
                return;
            }
        }
    }
}

fn anchor_for(scene: &GraphScene, index: usize) -> Option<Pos2> {
    let links = scene.links.get(&scene.nodes[index].id)?;
    links
        .outgoing
        .iter()
        .filter_map(|to_id| scene.node(to_id))
        .find_map(|neighbor| neighbor.pos)
}

fn collides(scene: &GraphScene, index: usize, candidate: Pos2) -> bool {
    scene.nodes.iter().enumerate().any(|(other, node)| {
        other != index
            && node.pos.is_some_and(|pos| {
                circle_contains(candidate.x, candidate.y, MIN_NODE_SPACING, pos.x, pos.y)
            })
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use eframe::egui::{Pos2, Rect, pos2};

    use crate::store::{EdgeRecord, GraphData, NodeRecord};

    use super::super::super::GraphScene;
    use super::{MIN_NODE_SPACING, locate_all};

    fn record(id: &str) -> NodeRecord {
        NodeRecord {
            id: id.to_owned(),
            labels: vec!["thing".to_owned()],
            properties: BTreeMap::from([("name".to_owned(), id.to_owned())]),
        }
    }

    fn edge_record(id: &str, from: &str, to: &str) -> EdgeRecord {
        EdgeRecord {
            id: id.to_owned(),
            from: from.to_owned(),
            to: to.to_owned(),
            label: "points".to_owned(),
            properties: BTreeMap::new(),
        }
    }

    fn scene_with(nodes: Vec<NodeRecord>, edges: Vec<EdgeRecord>) -> GraphScene {
        let mut scene = GraphScene::new(GraphData { nodes, edges });
        scene.canvas_rect = Rect::from_min_max(pos2(0.0, 0.0), pos2(1200.0, 800.0));
        scene
    }

    #[test]
    fn every_located_pair_keeps_minimum_spacing() {
        let nodes = (0..12).map(|i| record(&format!("n{i}"))).collect();
        let edges = vec![
            edge_record("e1", "n1", "n0"),
            edge_record("e2", "n2", "n0"),
            edge_record("e3", "n3", "n1"),
        ];
        let mut scene = scene_with(nodes, edges);
        locate_all(&mut scene);

        let positions: Vec<Pos2> = scene
            .nodes
            .iter()
            .map(|node| node.pos.expect("located"))
            .collect();

        for (i, a) in positions.iter().enumerate() {
            for b in positions.iter().skip(i + 1) {
                assert!(
                    a.distance(*b) >= MIN_NODE_SPACING,
                    "{a:?} and {b:?} are too close"
                );
            }
        }
    }

    #[test]
    fn unconnected_node_starts_from_the_center() {
        let mut scene = scene_with(vec![record("solo")], Vec::new());
        locate_all(&mut scene);

        assert_eq!(scene.nodes[0].pos, Some(pos2(600.0, 400.0)));
    }

    #[test]
    fn placement_anchors_on_a_located_outgoing_neighbor() {
        // B points at A; A already sits far away from the canvas center, so
        // B's spiral must start from A's position rather than the center.
        let mut scene = scene_with(
            vec![record("a"), record("b")],
            vec![edge_record("e", "b", "a")],
        );
        scene.rebuild_index();
        scene.node_mut("a").expect("a").pos = Some(pos2(0.0, 0.0));
        locate_all(&mut scene);

        let a = scene.node("a").expect("a").pos.expect("a located");
        let b = scene.node("b").expect("b").pos.expect("b located");
        let center = pos2(600.0, 400.0);

        assert!(b.distance(a) >= MIN_NODE_SPACING);
        assert!(
            b.distance(a) < b.distance(center),
            "b should orbit a, not the canvas center"
        );
    }

    #[test]
    fn incoming_neighbors_are_placed_as_a_cluster() {
        // Chain c -> b -> a with an unrelated node in between in array
        // order. Placing a pulls in b, then c, before "other" is visited.
        let mut scene = scene_with(
            vec![record("a"), record("other"), record("b"), record("c")],
            vec![edge_record("e1", "b", "a"), edge_record("e2", "c", "b")],
        );
        locate_all(&mut scene);

        let a = scene.node("a").expect("a").pos.expect("a located");
        let b = scene.node("b").expect("b").pos.expect("b located");
        let c = scene.node("c").expect("c").pos.expect("c located");

        // Each link lands on the first free spiral slot around its anchor.
        assert!(a.distance(b) <= MIN_NODE_SPACING * 1.2);
        assert!(b.distance(c) <= MIN_NODE_SPACING * 1.2);
    }

    #[test]
    fn relayout_is_deterministic_for_equal_input_order() {
        let nodes: Vec<NodeRecord> = (0..8).map(|i| record(&format!("n{i}"))).collect();
        let edges = vec![edge_record("e1", "n1", "n0"), edge_record("e2", "n2", "n1")];

        let mut first = scene_with(nodes.clone(), edges.clone());
        locate_all(&mut first);
        let mut second = scene_with(nodes, edges);
        locate_all(&mut second);

        for (a, b) in first.nodes.iter().zip(second.nodes.iter()) {
            assert_eq!(a.pos, b.pos, "layout diverged for {}", a.id);
        }
    }
}
