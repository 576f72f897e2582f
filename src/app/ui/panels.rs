use std::time::Duration;

use eframe::egui::{self, Align, Context, Layout, Vec2};

use crate::store::SearchOptions;

use super::super::SessionView;

impl SessionView {
    pub(in crate::app) fn show(&mut self, ctx: &Context) {
        self.update_frame_stats(ctx);
        self.poll_pending();
        self.service_find(ctx);

        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("graph-lens");
                    ui.separator();
                    ui.label(format!("nodes: {}", self.scene.nodes.len()));
                    ui.label(format!("edges: {}", self.scene.edges.len()));

                    if ui.button("Refetch").clicked() {
                        self.issue_queries(vec![SearchOptions::default()]);
                    }
                    if ui.button("Reset view").clicked() {
                        self.scene.viewport.offset = Vec2::ZERO;
                    }
                    if self.has_pending() {
                        ui.spinner();
                    }

                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        if let Some(stats) = self.frame_stats_text() {
                            ui.label(stats);
                        }
                    });
                });
            });

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(300.0)
            .show(ctx, |ui| self.draw_controls(ui));

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(340.0)
            .show(ctx, |ui| self.draw_details(ui));

        egui::CentralPanel::default().show(ctx, |ui| self.draw_canvas(ui));

        // In-flight remote calls are drained by polling, so keep frames
        // coming while any are outstanding.
        if self.has_pending() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }
}
