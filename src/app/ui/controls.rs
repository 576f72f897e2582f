use eframe::egui::{self, Key, RichText, Ui};

use super::super::find::UnlabeledTermPolicy;
use super::super::SessionView;

impl SessionView {
    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui) {
        ui.heading("Find");
        ui.add_space(4.0);

        let response = ui.text_edit_singleline(&mut self.find.text);
        if response.changed() {
            self.find_changed();
        }
        if response.lost_focus() && ui.input(|input| input.key_pressed(Key::Enter)) {
            self.find_committed();
        }
        ui.small("name, key:value, or label:value; combine with \"and\". Enter re-queries the store.");

        ui.add_space(8.0);
        egui::ComboBox::from_label("Unlabeled term policy")
            .selected_text(self.find.policy.label())
            .show_ui(ui, |ui| {
                ui.selectable_value(
                    &mut self.find.policy,
                    UnlabeledTermPolicy::LastMatchingLabel,
                    "last matching label",
                );
                ui.selectable_value(
                    &mut self.find.policy,
                    UnlabeledTermPolicy::FirstMatchingLabel,
                    "first matching label",
                );
            })
            .response
            .on_hover_text(
                "Which node's label an unlabeled term borrows when committing a multi-term search.",
            );

        ui.separator();
        ui.checkbox(&mut self.show_frame_stats, "Frame stats")
            .on_hover_text("Show a live frame-rate readout in the header.");

        ui.separator();
        ui.label(RichText::new("Canvas").strong());
        ui.small(
            "Drag a node to move it. Drag empty space to pan. Click an entity to view its \
             details. Double-click a node to focus the graph on it; double-click empty space \
             to reset the focus.",
        );
    }
}
