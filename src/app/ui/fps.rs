use eframe::egui::Context;

use super::super::SessionView;

impl SessionView {
    pub(in crate::app) fn update_frame_stats(&mut self, ctx: &Context) {
        const SAMPLE_WINDOW: usize = 180;

        let dt = ctx.input(|input| input.stable_dt);
        if dt <= f32::EPSILON {
            return;
        }

        self.fps_current = (1.0 / dt).clamp(0.0, 1000.0);
        self.fps_samples.push_back(self.fps_current);
        while self.fps_samples.len() > SAMPLE_WINDOW {
            self.fps_samples.pop_front();
        }
    }

    pub(in crate::app) fn frame_stats_text(&self) -> Option<String> {
        if !self.show_frame_stats || self.fps_current <= f32::EPSILON {
            return None;
        }

        let average = if self.fps_samples.is_empty() {
            self.fps_current
        } else {
            self.fps_samples.iter().sum::<f32>() / self.fps_samples.len() as f32
        };

        Some(format!(
            "FPS {:.0} | avg {average:.1} | {:.1} ms",
            self.fps_current,
            1000.0 / self.fps_current
        ))
    }
}
