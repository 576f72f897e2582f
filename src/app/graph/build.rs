use eframe::egui::{Rect, Vec2};

use crate::store::GraphData;

use super::super::render_utils::LabelColors;
use super::super::{Edge, GraphScene, Node, NodeLinks, Viewport};

impl GraphScene {
    pub(in crate::app) fn new(data: GraphData) -> Self {
        let mut scene = Self {
            viewport: Viewport::default(),
            nodes: Vec::new(),
            edges: Vec::new(),
            links: std::collections::HashMap::new(),
            index_by_id: std::collections::HashMap::new(),
            label_colors: LabelColors::default(),
            canvas_rect: Rect::ZERO,
        };
        scene.replace_data(data);
        scene
    }

    /// Discard the current entity collections and rehydrate from a fresh
    /// fetch. Label colors persist for the session; the pan offset resets.
    pub(in crate::app) fn replace_data(&mut self, data: GraphData) {
        self.nodes = data.nodes.into_iter().map(Node::from_record).collect();
        self.edges = data.edges.into_iter().map(Edge::from_record).collect();
        self.viewport.offset = Vec2::ZERO;

        // Register label colors in fetch order so fills stay stable for the
        // rest of the session.
        for node in &self.nodes {
            self.label_colors.fill_for(&node.labels);
        }

        self.rebuild_index();
    }

    /// Rebuild the id lookup and the directed adjacency lists from the
    /// current node/edge collections. Runs at the start of every render pass
    /// (full or partial); the index is never partially updated.
    pub(in crate::app) fn rebuild_index(&mut self) {
        self.index_by_id.clear();
        self.links.clear();

        for (index, node) in self.nodes.iter().enumerate() {
            self.index_by_id.insert(node.id.clone(), index);
            self.links.insert(node.id.clone(), NodeLinks::default());
        }

        for edge in &self.edges {
            if !self.index_by_id.contains_key(&edge.from)
                || !self.index_by_id.contains_key(&edge.to)
            {
                log::warn!(
                    "edge {} references a missing node ({} -> {}), skipping",
                    edge.id,
                    edge.from,
                    edge.to
                );
                continue;
            }

            if let Some(links) = self.links.get_mut(&edge.from) {
                links.outgoing.push(edge.to.clone());
            }
            if let Some(links) = self.links.get_mut(&edge.to) {
                links.incoming.push(edge.from.clone());
            }
        }
    }

    /// Forget every computed position ahead of a full relayout.
    pub(in crate::app) fn clear_locations(&mut self) {
        for node in &mut self.nodes {
            node.pos = None;
        }
        for edge in &mut self.edges {
            edge.label_pos = None;
            edge.endpoints = None;
        }
    }

    /// Move a node to the head of the array so it anchors the next relayout,
    /// wins hit-testing, and paints above its siblings. The id lookup goes
    /// stale until the next render pass rebuilds it.
    pub(in crate::app) fn move_to_front(&mut self, id: &str) {
        if let Some(index) = self.nodes.iter().position(|node| node.id == id) {
            let node = self.nodes.remove(index);
            self.nodes.insert(0, node);
        }
    }

    /// Remove a node and, defensively, every edge referencing it. The store
    /// removes the edges on its side as well.
    pub(in crate::app) fn remove_node(&mut self, id: &str) {
        self.edges.retain(|edge| edge.from != id && edge.to != id);
        self.nodes.retain(|node| node.id != id);
        self.rebuild_index();
    }

    pub(in crate::app) fn remove_edge(&mut self, id: &str) {
        self.edges.retain(|edge| edge.id != id);
        self.rebuild_index();
    }

    pub(in crate::app) fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub(in crate::app) fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|node| node.id == id)
    }

    pub(in crate::app) fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.iter().find(|edge| edge.id == id)
    }

    pub(in crate::app) fn clear_down_flags(&mut self) {
        for node in &mut self.nodes {
            node.down = false;
        }
    }

    /// Clear every selection flag. Returns whether anything changed.
    pub(in crate::app) fn clear_selection(&mut self) -> bool {
        let mut changed = false;
        for node in &mut self.nodes {
            changed |= node.selected;
            node.selected = false;
        }
        for edge in &mut self.edges {
            changed |= edge.selected;
            edge.selected = false;
        }
        changed
    }

    pub(in crate::app) fn select_node(&mut self, index: usize) {
        self.clear_selection();
        if let Some(node) = self.nodes.get_mut(index) {
            node.selected = true;
        }
    }

    pub(in crate::app) fn select_edge(&mut self, index: usize) {
        self.clear_selection();
        if let Some(edge) = self.edges.get_mut(index) {
            edge.selected = true;
        }
    }
}
