//! Stand-in preview: a gradient plate pushed through the active filter chain, with overlays on top.

use eframe::egui::{pos2, Color32, Pos2, Rect};
use timeline::{apply_chain, parse_hex_color, ClipId, EffectToken, FilterOp};
use tracing::debug;

pub(crate) mod ui;

/// Number of vertical bands in the preview plate.
pub(crate) const BANDS: usize = 32;

fn to_color32(c: [f32; 3]) -> Color32 {
    let [r, g, b] = c.map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8);
    Color32::from_rgb(r, g, b)
}

/// Two plate colours derived from the clip id, so switching clips is visible.
pub(crate) fn plate_colors(clip: ClipId) -> [[f32; 3]; 2] {
    let hue = (clip.to_string().bytes().fold(0u32, |h, b| h.wrapping_mul(31).wrapping_add(b as u32)) % 360) as f32;
    let base = FilterOp::HueRotate(hue).apply_rgb([0.85, 0.35, 0.25]);
    let dark = base.map(|v| v * 0.25);
    [dark, base]
}

/// Filter ops for `effect`. An unparseable chain previews unfiltered.
pub(crate) fn filter_ops(effect: &EffectToken) -> Vec<FilterOp> {
    effect.parse().unwrap_or_else(|e| {
        debug!(effect = %effect, "unparseable effect: {e}");
        Vec::new()
    })
}

/// Colour of each band from `from` to `to`, with `ops` applied.
pub(crate) fn tinted_bands(ops: &[FilterOp], [from, to]: [[f32; 3]; 2], bands: usize) -> Vec<Color32> {
    let steps = bands.max(2) - 1;
    (0..bands)
        .map(|i| {
            let t = i as f32 / steps as f32;
            let c = [0, 1, 2].map(|k| from[k] + (to[k] - from[k]) * t);
            to_color32(apply_chain(ops, c))
        })
        .collect()
}

/// Maps percentage coordinates to a point inside `rect`.
pub(crate) fn overlay_pos(rect: Rect, x_pct: f32, y_pct: f32) -> Pos2 {
    pos2(
        rect.min.x + rect.width() * x_pct.clamp(0.0, 100.0) / 100.0,
        rect.min.y + rect.height() * y_pct.clamp(0.0, 100.0) / 100.0,
    )
}

pub(crate) fn overlay_color(hex: &str) -> Color32 {
    parse_hex_color(hex).map(|[r, g, b]| Color32::from_rgb(r, g, b)).unwrap_or(Color32::WHITE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grayscale_bands_are_neutral() {
        let ops = filter_ops(&EffectToken::new("grayscale(100%)"));
        for c in tinted_bands(&ops, [[0.9, 0.2, 0.1], [0.1, 0.3, 0.8]], 8) {
            assert_eq!(c.r(), c.g());
            assert_eq!(c.g(), c.b());
        }
    }

    #[test]
    fn broken_chain_previews_unfiltered() {
        let plate = [[0.0, 0.0, 0.0], [1.0, 0.5, 0.0]];
        let plain = tinted_bands(&[], plate, 4);
        let broken = tinted_bands(&filter_ops(&EffectToken::new("wobble(3)")), plate, 4);
        assert_eq!(plain, broken);
        assert_eq!(plain[0], Color32::BLACK);
        assert_eq!(plain[3], Color32::from_rgb(255, 128, 0));
    }

    #[test]
    fn overlay_positions_are_percentages() {
        let rect = Rect::from_min_max(pos2(10.0, 20.0), pos2(210.0, 120.0));
        assert_eq!(overlay_pos(rect, 50.0, 50.0), pos2(110.0, 70.0));
        assert_eq!(overlay_pos(rect, 150.0, -5.0), pos2(210.0, 20.0));
    }

    #[test]
    fn overlay_color_falls_back_to_white() {
        assert_eq!(overlay_color("#ff0000"), Color32::from_rgb(255, 0, 0));
        assert_eq!(overlay_color("teal"), Color32::WHITE);
    }
}
