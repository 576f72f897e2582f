use eframe::egui::{self, Pos2, Response, Ui};

use crate::store::{FocusFilter, SearchOptions};

use super::super::{DetailView, DragState, GraphScene, NODE_RADIUS, SessionView};

/// Edges are hit-tested as a small circle around their label midpoint, not
/// by true segment proximity.
const EDGE_HIT_RADIUS: f32 = 10.0;

impl GraphScene {
    /// First node under the point, in array order. Array order is front-most
    /// order, so the winner is also the node painted on top.
    pub(in crate::app) fn hit_node_at(&self, point: Pos2) -> Option<usize> {
        self.nodes.iter().position(|node| {
            node.pos.is_some_and(|pos| {
                self.viewport
                    .hit_test_circle(self.canvas_rect, pos, NODE_RADIUS, point)
            })
        })
    }

    pub(in crate::app) fn hit_edge_at(&self, point: Pos2) -> Option<usize> {
        self.edges.iter().position(|edge| {
            edge.label_pos.is_some_and(|pos| {
                self.viewport
                    .hit_test_circle(self.canvas_rect, pos, EDGE_HIT_RADIUS, point)
            })
        })
    }

    fn set_exclusive_node_hover(&mut self, hit: Option<usize>) -> bool {
        let mut changed = false;
        for (index, node) in self.nodes.iter_mut().enumerate() {
            let hover = hit == Some(index);
            changed |= node.hover != hover;
            node.hover = hover;
        }
        changed
    }

    fn set_exclusive_edge_hover(&mut self, hit: Option<usize>) -> bool {
        let mut changed = false;
        for (index, edge) in self.edges.iter_mut().enumerate() {
            let hover = hit == Some(index);
            changed |= edge.hover != hover;
            edge.hover = hover;
        }
        changed
    }
}

impl SessionView {
    /// Translate egui pointer state into the down/move/up/double-click
    /// machine. All positions stay in screen space until a handler converts
    /// them through the viewport.
    pub(in crate::app) fn handle_pointer(&mut self, ui: &Ui, response: &Response) {
        if response.double_clicked()
            && let Some(pos) = response.interact_pointer_pos()
        {
            self.double_click(pos);
        }

        let pointer = ui.input(|input| input.pointer.latest_pos());
        let pressed = ui.input(|input| input.pointer.primary_pressed());
        let released = ui.input(|input| input.pointer.primary_released());

        if pressed
            && response.hovered()
            && let Some(pos) = pointer
        {
            self.pointer_down(pos);
        }

        if released {
            // A release belongs to the canvas when a gesture is in flight or
            // the pointer is over it; releases on other panels are ignored.
            let was_gesturing = self.drag != DragState::Idle;
            match pointer {
                Some(pos) if was_gesturing || self.scene.canvas_rect.contains(pos) => {
                    self.pointer_up(pos);
                }
                _ => {
                    self.drag = DragState::Idle;
                    self.scene.clear_down_flags();
                }
            }
        } else if let Some(pos) = pointer
            && (response.hovered() || self.drag != DragState::Idle)
            && self.pointer_moved(pos)
        {
            ui.ctx().request_repaint();
        }

        let cursor = match &self.drag {
            DragState::NodeDown { .. } | DragState::Panning { .. } => {
                Some(egui::CursorIcon::Grabbing)
            }
            DragState::Idle => {
                let over_entity = self.scene.nodes.iter().any(|node| node.hover)
                    || self.scene.edges.iter().any(|edge| edge.hover);
                over_entity.then_some(egui::CursorIcon::PointingHand)
            }
        };
        if let Some(cursor) = cursor {
            ui.output_mut(|output| output.cursor_icon = cursor);
        }
    }

    pub(in crate::app) fn pointer_down(&mut self, pos: Pos2) {
        self.scene.clear_down_flags();

        if let Some(index) = self.scene.hit_node_at(pos) {
            self.scene.nodes[index].down = true;
            let id = self.scene.nodes[index].id.clone();
            self.drag = DragState::NodeDown { id };
            return;
        }

        if self.scene.hit_edge_at(pos).is_some() {
            // An edge under the pointer is only recorded; it neither drags
            // nor starts a pan gesture.
            self.drag = DragState::Idle;
            return;
        }

        self.drag = DragState::Panning {
            start: pos,
            origin: self.scene.viewport.offset,
        };
    }

    /// Returns whether anything changed that warrants a repaint.
    pub(in crate::app) fn pointer_moved(&mut self, pos: Pos2) -> bool {
        match self.drag.clone() {
            DragState::NodeDown { id } => {
                let rect = self.scene.canvas_rect;
                let graph_pos = self.scene.viewport.to_graph(rect, pos);
                // The down flag is the authority; anything that cleared it
                // cancels the drag.
                if let Some(node) = self.scene.node_mut(&id)
                    && node.down
                {
                    node.pos = Some(graph_pos);
                }
                true
            }
            DragState::Panning { start, origin } => {
                let scale = self.scene.viewport.scale;
                self.scene.viewport.offset = origin + (pos - start) * scale;
                true
            }
            DragState::Idle => {
                let node_hit = self.scene.hit_node_at(pos);
                let mut changed = self.scene.set_exclusive_node_hover(node_hit);
                // Edges only take hover when no node has it.
                let edge_hit = if node_hit.is_none() {
                    self.scene.hit_edge_at(pos)
                } else {
                    None
                };
                changed |= self.scene.set_exclusive_edge_hover(edge_hit);
                changed
            }
        }
    }

    pub(in crate::app) fn pointer_up(&mut self, pos: Pos2) {
        self.drag = DragState::Idle;
        self.scene.clear_down_flags();

        if let Some(index) = self.scene.hit_node_at(pos) {
            self.scene.select_node(index);
            self.detail = DetailView::Node(self.scene.nodes[index].id.clone());
            return;
        }

        if let Some(index) = self.scene.hit_edge_at(pos) {
            self.scene.select_edge(index);
            self.detail = DetailView::Edge(self.scene.edges[index].id.clone());
            return;
        }

        self.scene.clear_selection();
        self.detail = DetailView::None;
    }

    /// Double-clicking a node refetches the graph focused on that node;
    /// double-clicking empty space resets to the unfiltered fetch.
    pub(in crate::app) fn double_click(&mut self, pos: Pos2) {
        if let Some(index) = self.scene.hit_node_at(pos) {
            let node = &self.scene.nodes[index];
            let Some(label) = node.primary_label() else {
                log::warn!("node {} has no label to focus on", node.id);
                return;
            };

            let filter = FocusFilter::property(label, "name", node.name());
            self.issue_queries(vec![SearchOptions::focused(filter)]);
        } else {
            self.issue_queries(vec![SearchOptions::default()]);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use std::time::Duration;

    use eframe::egui::{Rect, pos2, vec2};

    use crate::store::{EdgeRecord, GraphData, JsonStore, NodeRecord};

    use super::super::super::{DeleteTarget, DetailView, DragState, SessionView};
    use super::super::locate::locate_all;

    fn record(id: &str, name: &str) -> NodeRecord {
        NodeRecord {
            id: id.to_owned(),
            labels: vec!["person".to_owned()],
            properties: BTreeMap::from([("name".to_owned(), name.to_owned())]),
        }
    }

    fn session_with(data: GraphData) -> SessionView {
        let mut session = SessionView::new(Arc::new(JsonStore::empty()), data);
        session.scene.canvas_rect = Rect::from_min_max(pos2(0.0, 0.0), pos2(1000.0, 700.0));
        locate_all(&mut session.scene);
        session
    }

    fn screen_pos_of(session: &SessionView, id: &str) -> eframe::egui::Pos2 {
        let scene = &session.scene;
        let graph_pos = scene.node(id).expect("node").pos.expect("located");
        scene.viewport.to_screen(scene.canvas_rect, graph_pos)
    }

    #[test]
    fn located_node_is_hit_at_its_position_and_missed_far_away() {
        let session = session_with(GraphData {
            nodes: vec![record("n1", "Eric")],
            edges: Vec::new(),
        });

        let on_node = screen_pos_of(&session, "n1");
        assert_eq!(session.scene.hit_node_at(on_node), Some(0));
        assert_eq!(
            session.scene.hit_node_at(on_node + vec2(200.0, 200.0)),
            None
        );
    }

    #[test]
    fn down_then_drag_moves_the_node() {
        let mut session = session_with(GraphData {
            nodes: vec![record("n1", "Eric")],
            edges: Vec::new(),
        });

        let start = screen_pos_of(&session, "n1");
        session.pointer_down(start);
        assert!(session.scene.nodes[0].down);
        assert_eq!(
            session.drag,
            DragState::NodeDown {
                id: "n1".to_owned()
            }
        );

        let target = start + vec2(120.0, -40.0);
        assert!(session.pointer_moved(target));
        let moved = session.scene.nodes[0].pos.expect("still located");
        let expected = session
            .scene
            .viewport
            .to_graph(session.scene.canvas_rect, target);
        assert_eq!(moved, expected);

        session.pointer_up(target);
        assert!(!session.scene.nodes[0].down);
        assert!(session.scene.nodes[0].selected);
        assert_eq!(session.detail, DetailView::Node("n1".to_owned()));
    }

    #[test]
    fn empty_space_drag_pans_the_viewport() {
        let mut session = session_with(GraphData {
            nodes: vec![record("n1", "Eric")],
            edges: Vec::new(),
        });

        let start = pos2(20.0, 20.0);
        session.pointer_down(start);
        assert!(matches!(session.drag, DragState::Panning { .. }));

        session.pointer_moved(start + vec2(30.0, 50.0));
        assert_eq!(session.scene.viewport.offset, vec2(30.0, 50.0));

        // Hit-testing tracks the new transform with no cached inverse.
        let shifted = screen_pos_of(&session, "n1");
        session.pointer_up(shifted);
        assert!(session.scene.nodes[0].selected);
    }

    #[test]
    fn hover_is_exclusive_and_prefers_nodes_over_edges() {
        let mut session = session_with(GraphData {
            nodes: vec![record("n1", "Eric"), record("n2", "Dana")],
            edges: vec![EdgeRecord {
                id: "e1".to_owned(),
                from: "n1".to_owned(),
                to: "n2".to_owned(),
                label: "knows".to_owned(),
                properties: BTreeMap::new(),
            }],
        });

        // Park the edge label under n1 to force the contested case.
        let n1_graph = session.scene.node("n1").expect("n1").pos;
        session.scene.edges[0].label_pos = n1_graph;

        let over_n1 = screen_pos_of(&session, "n1");
        assert!(session.pointer_moved(over_n1));
        assert!(session.scene.nodes[0].hover);
        assert!(!session.scene.nodes[1].hover);
        assert!(!session.scene.edges[0].hover);

        // Unchanged hover state needs no repaint.
        assert!(!session.pointer_moved(over_n1));
    }

    #[test]
    fn pointer_up_on_empty_space_clears_selection_and_detail() {
        let mut session = session_with(GraphData {
            nodes: vec![record("n1", "Eric")],
            edges: Vec::new(),
        });

        let on_node = screen_pos_of(&session, "n1");
        session.pointer_down(on_node);
        session.pointer_up(on_node);
        assert_eq!(session.detail, DetailView::Node("n1".to_owned()));

        let far = on_node + vec2(300.0, 300.0);
        session.pointer_down(far);
        session.pointer_up(far);
        assert!(!session.scene.nodes[0].selected);
        assert_eq!(session.detail, DetailView::None);
    }

    #[test]
    fn deleting_a_node_prunes_local_state_and_clears_the_detail_view() {
        let data = GraphData {
            nodes: vec![record("n1", "Eric"), record("n2", "Dana")],
            edges: vec![
                EdgeRecord {
                    id: "e1".to_owned(),
                    from: "n1".to_owned(),
                    to: "n2".to_owned(),
                    label: "knows".to_owned(),
                    properties: BTreeMap::new(),
                },
                EdgeRecord {
                    id: "e2".to_owned(),
                    from: "n2".to_owned(),
                    to: "n1".to_owned(),
                    label: "knows".to_owned(),
                    properties: BTreeMap::new(),
                },
            ],
        };
        let mut session = session_with(data);
        session.detail = DetailView::Node("n1".to_owned());
        session.relayout_needed = false;

        session.issue_delete(DeleteTarget::Node("n1".to_owned()));
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while session.has_pending() && std::time::Instant::now() < deadline {
            session.poll_pending();
            std::thread::sleep(Duration::from_millis(5));
        }

        assert!(session.scene.node("n1").is_none());
        assert!(session
            .scene
            .edges
            .iter()
            .all(|edge| edge.from != "n1" && edge.to != "n1"));
        assert_eq!(session.detail, DetailView::None);
        // The repaired full re-render path runs instead of a session reload.
        assert!(session.relayout_needed);
    }

    #[test]
    fn stale_search_responses_are_discarded() {
        let eric = GraphData {
            nodes: vec![record("n1", "Eric")],
            edges: Vec::new(),
        };
        let dana = GraphData {
            nodes: vec![record("n2", "Dana")],
            edges: Vec::new(),
        };

        let mut session = SessionView::new(Arc::new(JsonStore::with_data(eric)), GraphData::default());
        session.scene.canvas_rect = Rect::from_min_max(pos2(0.0, 0.0), pos2(1000.0, 700.0));

        // First query races against a second one issued right after; only
        // the newest generation may win, whatever the arrival order.
        session.issue_queries(vec![crate::store::SearchOptions::default()]);
        session.store = Arc::new(JsonStore::with_data(dana));
        session.issue_queries(vec![crate::store::SearchOptions::default()]);

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while session.has_pending() && std::time::Instant::now() < deadline {
            session.poll_pending();
            std::thread::sleep(Duration::from_millis(5));
        }

        assert_eq!(session.scene.nodes.len(), 1);
        assert_eq!(session.scene.nodes[0].id, "n2");
    }
}
