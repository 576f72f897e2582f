use eframe::egui::{RichText, Ui};

use crate::util::{Rgb, hash_color, rgb_to_hex, text_color_for};

use super::super::render_utils::{TEXT_DARK, TEXT_LIGHT, to_color32};
use super::super::{DeleteTarget, DetailView, GraphScene, SessionView};

/// Detail panel view-model for a node, projected from the entity rather than
/// shallow-copied off it.
pub(in crate::app) struct NodeDetails {
    header: String,
    id: String,
    labels: Vec<(String, Rgb)>,
    properties: Vec<(String, String)>,
    json: String,
}

pub(in crate::app) struct EdgeDetails {
    label: String,
    label_color: Rgb,
    id: String,
    from_name: String,
    to_name: String,
    properties: Vec<(String, String)>,
    json: String,
}

fn node_details(scene: &mut GraphScene, id: &str) -> Option<NodeDetails> {
    let GraphScene {
        nodes,
        label_colors,
        ..
    } = scene;
    let node = nodes.iter().find(|node| node.id == id)?;

    Some(NodeDetails {
        header: node.name().to_owned(),
        id: node.id.clone(),
        labels: node
            .labels
            .iter()
            .map(|label| {
                let color = label_colors.fill_for(std::slice::from_ref(label));
                (label.clone(), color)
            })
            .collect(),
        properties: node
            .properties
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect(),
        json: serde_json::to_string_pretty(&node.to_record())
            .unwrap_or_else(|error| format!("serialization failed: {error}")),
    })
}

fn edge_details(scene: &GraphScene, id: &str) -> Option<EdgeDetails> {
    let edge = scene.edge(id)?;

    let endpoint_name = |node_id: &str| {
        scene
            .node(node_id)
            .map(|node| node.name().to_owned())
            .unwrap_or_else(|| node_id.to_owned())
    };

    Some(EdgeDetails {
        label: edge.label.clone(),
        label_color: hash_color(&edge.label),
        id: edge.id.clone(),
        from_name: endpoint_name(&edge.from),
        to_name: endpoint_name(&edge.to),
        properties: edge
            .properties
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect(),
        json: serde_json::to_string_pretty(&edge.to_record())
            .unwrap_or_else(|error| format!("serialization failed: {error}")),
    })
}

fn chip(ui: &mut Ui, text: &str, background: Rgb) {
    let foreground = text_color_for(background, TEXT_LIGHT, TEXT_DARK);
    ui.label(
        RichText::new(text)
            .background_color(to_color32(background))
            .color(to_color32(foreground)),
    )
    .on_hover_text(format!("#{}", rgb_to_hex(background)));
}

fn property_rows(ui: &mut Ui, properties: &[(String, String)]) {
    if properties.is_empty() {
        ui.small("No properties.");
        return;
    }

    for (key, value) in properties {
        ui.horizontal(|ui| {
            ui.label(RichText::new(key).strong());
            ui.label(value);
        });
    }
}

impl SessionView {
    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui) {
        ui.heading("Details");
        ui.add_space(6.0);

        match self.detail.clone() {
            DetailView::None => {
                ui.label("Click a node or an edge to view its details.");
            }
            DetailView::Node(id) => self.draw_node_details(ui, &id),
            DetailView::Edge(id) => self.draw_edge_details(ui, &id),
        }
    }

    fn draw_node_details(&mut self, ui: &mut Ui, id: &str) {
        let Some(details) = node_details(&mut self.scene, id) else {
            ui.label("The selected node is no longer in the graph.");
            return;
        };

        ui.label(RichText::new(&details.header).strong());
        ui.small(&details.id);
        ui.add_space(6.0);

        ui.horizontal_wrapped(|ui| {
            for (label, color) in &details.labels {
                chip(ui, label, *color);
            }
        });

        ui.add_space(6.0);
        property_rows(ui, &details.properties);

        ui.add_space(6.0);
        ui.collapsing("Raw JSON", |ui| {
            ui.monospace(&details.json);
        });

        ui.add_space(10.0);
        if ui.button("Delete node").clicked() {
            self.issue_delete(DeleteTarget::Node(id.to_owned()));
        }
    }

    fn draw_edge_details(&mut self, ui: &mut Ui, id: &str) {
        let Some(details) = edge_details(&self.scene, id) else {
            ui.label("The selected edge is no longer in the graph.");
            return;
        };

        ui.horizontal(|ui| {
            ui.label(&details.from_name);
            chip(ui, &details.label, details.label_color);
            ui.label(&details.to_name);
        });
        ui.small(&details.id);

        ui.add_space(6.0);
        property_rows(ui, &details.properties);

        ui.add_space(6.0);
        ui.collapsing("Raw JSON", |ui| {
            ui.monospace(&details.json);
        });

        ui.add_space(10.0);
        if ui.button("Delete edge").clicked() {
            self.issue_delete(DeleteTarget::Edge(id.to_owned()));
        }
    }
}
