use eframe::egui::{Align2, Color32, FontId, Painter, Pos2, Sense, Shape, Stroke, Ui, vec2};

use crate::util::{invert, text_color_for};

use super::super::render_utils::{BACKGROUND, TEXT_DARK, TEXT_LIGHT, draw_background, to_color32};
use super::super::{GraphScene, NODE_RADIUS, SessionView};
use super::locate::locate_all;

const LABEL_HOLE_RADIUS: f32 = 12.0;
const ARROW_LENGTH: f32 = 10.0;
const ARROW_HALF_WIDTH: f32 = 5.0;

const EDGE_COLOR: Color32 = Color32::from_gray(150);
const EDGE_EMPHASIS_COLOR: Color32 = Color32::from_gray(235);

impl SessionView {
    /// One render pass. A full render (after data replacement, deletion, a
    /// resize, or a find highlight) clears and recomputes every position; a
    /// partial render draws the existing positions unchanged, which is what
    /// dragging, panning, and hover churn want.
    pub(in crate::app) fn draw_canvas(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);

        if self.scene.canvas_rect.size() != rect.size() {
            self.relayout_needed = true;
        }
        self.scene.canvas_rect = rect;

        draw_background(&painter, rect, &self.scene.viewport);

        // Placement and drawing both resolve edge endpoints by id, so the
        // scene index is rebuilt on every pass, full or partial.
        self.scene.rebuild_index();

        self.handle_pointer(ui, &response);

        if self.relayout_needed {
            self.scene.clear_locations();
            locate_all(&mut self.scene);
            self.relayout_needed = false;
        }

        update_edge_geometry(&mut self.scene);
        draw_edges(&self.scene, &painter);
        draw_nodes(&mut self.scene, &painter);
    }
}

fn endpoint_positions(scene: &GraphScene, index: usize) -> Option<(Pos2, Pos2)> {
    let edge = &scene.edges[index];
    let from = scene
        .index_by_id
        .get(&edge.from)
        .and_then(|&i| scene.nodes.get(i))?;
    let to = scene
        .index_by_id
        .get(&edge.to)
        .and_then(|&i| scene.nodes.get(i))?;
    Some((from.pos?, to.pos?))
}

/// Refresh each edge's label center and boundary attachment points from the
/// current node positions. Hit-testing keys on the stored label center, so
/// this runs on every pass before anything is painted.
fn update_edge_geometry(scene: &mut GraphScene) {
    for index in 0..scene.edges.len() {
        // A dangling or not-yet-located endpoint leaves the edge without
        // geometry; it is skipped when drawing and cannot win hit tests.
        let Some((from_pos, to_pos)) = endpoint_positions(scene, index) else {
            let edge = &mut scene.edges[index];
            edge.label_pos = None;
            edge.endpoints = None;
            log::debug!("skipping edge {} with unresolved endpoints", edge.id);
            continue;
        };

        let delta = to_pos - from_pos;
        let length = delta.length();

        let edge = &mut scene.edges[index];
        edge.label_pos = Some(from_pos + delta * 0.5);

        if length <= f32::EPSILON {
            edge.endpoints = None;
            continue;
        }

        // Shorten by one radius at each end so the line runs boundary to
        // boundary instead of center to center.
        let dir = delta / length;
        edge.endpoints = Some((from_pos + dir * NODE_RADIUS, to_pos - dir * NODE_RADIUS));
    }
}

/// Edges draw before nodes so node circles occlude the line ends.
fn draw_edges(scene: &GraphScene, painter: &Painter) {
    let rect = scene.canvas_rect;
    let viewport = &scene.viewport;

    for edge in &scene.edges {
        let (Some(label_pos), Some((start, end))) = (edge.label_pos, edge.endpoints) else {
            continue;
        };

        let emphasized = edge.hover || edge.selected;
        let color = if emphasized {
            EDGE_EMPHASIS_COLOR
        } else {
            EDGE_COLOR
        };
        let stroke_width = if emphasized { 2.0 } else { 1.0 };

        painter.line_segment(
            [
                viewport.to_screen(rect, start),
                viewport.to_screen(rect, end),
            ],
            Stroke::new(stroke_width, color),
        );

        // Arrowhead at the destination boundary, oriented along the line.
        // Nodes dragged on top of each other leave no line to orient along.
        let line = end - start;
        if line.length_sq() > f32::EPSILON {
            let dir = line.normalized();
            let base = end - dir * ARROW_LENGTH;
            let perp = vec2(-dir.y, dir.x);
            painter.add(Shape::convex_polygon(
                vec![
                    viewport.to_screen(rect, end),
                    viewport.to_screen(rect, base + perp * ARROW_HALF_WIDTH),
                    viewport.to_screen(rect, base - perp * ARROW_HALF_WIDTH),
                ],
                color,
                Stroke::NONE,
            ));
        }

        // Opaque hole so the label reads over the line.
        let label_screen = viewport.to_screen(rect, label_pos);
        painter.circle_filled(label_screen, LABEL_HOLE_RADIUS * viewport.scale, BACKGROUND);

        if !edge.label.is_empty() {
            painter.text(
                label_screen,
                Align2::CENTER_CENTER,
                &edge.label,
                FontId::proportional(if emphasized { 13.0 } else { 12.0 }),
                color,
            );
        }
    }
}

/// Nodes draw in reverse array order: the head of the array paints last and
/// therefore on top, matching hit-test priority.
fn draw_nodes(scene: &mut GraphScene, painter: &Painter) {
    let rect = scene.canvas_rect;
    let GraphScene {
        nodes,
        label_colors,
        viewport,
        ..
    } = scene;

    for node in nodes.iter().rev() {
        // Placement failures stay undrawn.
        let Some(pos) = node.pos else {
            continue;
        };

        let fill = label_colors.fill_for(&node.labels);
        let emphasized = node.hover || node.selected;
        let (stroke_width, radius) = if emphasized {
            (5.0, NODE_RADIUS + 5.0)
        } else {
            (2.0, NODE_RADIUS)
        };

        let center = viewport.to_screen(rect, pos);
        let screen_radius = radius * viewport.scale;
        painter.circle_filled(center, screen_radius, to_color32(fill));
        painter.circle_stroke(
            center,
            screen_radius,
            Stroke::new(stroke_width, to_color32(invert(fill))),
        );

        let text_color = to_color32(text_color_for(fill, TEXT_LIGHT, TEXT_DARK));
        painter.text(
            center,
            Align2::CENTER_CENTER,
            node.name(),
            FontId::proportional(if node.selected { 13.0 } else { 12.0 }),
            text_color,
        );
    }
}
