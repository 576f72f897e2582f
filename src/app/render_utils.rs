use eframe::egui::{Color32, Painter, Pos2, Rect, Stroke};

use crate::util::{Rgb, hex_to_rgb};

use super::Viewport;

pub(super) const BACKGROUND: Color32 = Color32::from_rgb(19, 23, 29);
pub(super) const TEXT_LIGHT: Rgb = Rgb::new(0xff, 0xff, 0xff);
pub(super) const TEXT_DARK: Rgb = Rgb::new(0x00, 0x00, 0x00);

const LABEL_PALETTE: [&str; 9] = [
    "#6166B3", "#32C1CD", "#17D7A0", "#C85C5C", "#F9975D", "#FBD148", "#B2EA70", "#8A8635",
    "#E9C891",
];
const GENERIC_LABEL_COLOR: &str = "#666699";

pub(super) fn to_color32(rgb: Rgb) -> Color32 {
    Color32::from_rgb(rgb.r, rgb.g, rgb.b)
}

/// Palette slots are handed out to primary labels in first-seen order; once
/// the palette runs out every further label shares the generic color. Stable
/// within a session, not across reloads, since first-seen order follows
/// fetch order.
pub(crate) struct LabelColors {
    palette: Vec<Rgb>,
    known: Vec<String>,
    generic: Rgb,
}

impl Default for LabelColors {
    fn default() -> Self {
        let generic = hex_to_rgb(GENERIC_LABEL_COLOR).unwrap_or(Rgb::new(0x66, 0x66, 0x99));
        Self {
            palette: LABEL_PALETTE
                .iter()
                .filter_map(|hex| hex_to_rgb(hex))
                .collect(),
            known: Vec::new(),
            generic,
        }
    }
}

impl LabelColors {
    pub(super) fn fill_for(&mut self, labels: &[String]) -> Rgb {
        let Some(label) = labels.first() else {
            return self.generic;
        };

        if let Some(index) = self.known.iter().position(|known| known == label) {
            return self.palette[index];
        }

        if self.known.len() < self.palette.len() {
            self.known.push(label.clone());
            return self.palette[self.known.len() - 1];
        }

        self.generic
    }
}

pub(super) fn draw_background(painter: &Painter, rect: Rect, viewport: &Viewport) {
    painter.rect_filled(rect, 0.0, BACKGROUND);

    let step = (56.0 * viewport.scale.clamp(0.6, 1.8)).max(20.0);
    let origin = rect.left_top() + viewport.offset;
    let grid_stroke = Stroke::new(1.0, Color32::from_rgba_unmultiplied(60, 70, 80, 70));

    let mut x = origin.x.rem_euclid(step);
    while x < rect.right() {
        painter.line_segment(
            [Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())],
            grid_stroke,
        );
        x += step;
    }

    let mut y = origin.y.rem_euclid(step);
    while y < rect.bottom() {
        painter.line_segment(
            [Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)],
            grid_stroke,
        );
        y += step;
    }
}

#[cfg(test)]
mod tests {
    use crate::util::Rgb;

    use super::LabelColors;

    fn label(name: &str) -> Vec<String> {
        vec![name.to_owned()]
    }

    #[test]
    fn palette_slots_are_assigned_in_first_seen_order() {
        let mut colors = LabelColors::default();

        let person = colors.fill_for(&label("person"));
        let place = colors.fill_for(&label("place"));

        assert_ne!(person, place);
        assert_eq!(colors.fill_for(&label("person")), person);
        assert_eq!(colors.fill_for(&label("place")), place);
    }

    #[test]
    fn exhausted_palette_falls_back_to_the_generic_color() {
        let mut colors = LabelColors::default();
        for index in 0..9 {
            colors.fill_for(&label(&format!("label-{index}")));
        }

        let generic = Rgb::new(0x66, 0x66, 0x99);
        assert_eq!(colors.fill_for(&label("overflow-a")), generic);
        assert_eq!(colors.fill_for(&label("overflow-b")), generic);
        // Earlier labels keep their palette slots.
        assert_ne!(colors.fill_for(&label("label-0")), generic);
    }

    #[test]
    fn unlabeled_entities_use_the_generic_color() {
        let mut colors = LabelColors::default();
        assert_eq!(colors.fill_for(&[]), Rgb::new(0x66, 0x66, 0x99));
    }
}
