use eframe::egui::{Color32, Pos2, Vec2};

/// Scales the alpha channel, keeping the hue.
pub(super) fn fade(color: Color32, factor: f32) -> Color32 {
    let factor = factor.clamp(0.0, 1.0);
    let [r, g, b, a] = color.to_srgba_unmultiplied();
    Color32::from_rgba_unmultiplied(r, g, b, (a as f32 * factor) as u8)
}

/// Whether a circle overlaps the surface `[0, size]`.
pub(super) fn circle_visible(size: Vec2, center: Pos2, radius: f32) -> bool {
    center.x + radius >= 0.0
        && center.x - radius <= size.x
        && center.y + radius >= 0.0
        && center.y - radius <= size.y
}

/// Whether the segment crosses the surface grown by `padding`, by clipping the
/// segment's parameter range against each slab.
pub(super) fn segment_visible(size: Vec2, start: Pos2, end: Pos2, padding: f32) -> bool {
    let delta = end - start;
    let mut enter = 0.0_f32;
    let mut exit = 1.0_f32;

    for (origin, step, low, high) in [
        (start.x, delta.x, -padding, size.x + padding),
        (start.y, delta.y, -padding, size.y + padding),
    ] {
        if step.abs() <= f32::EPSILON {
            if origin < low || origin > high {
                return false;
            }
            continue;
        }
        let mut near = (low - origin) / step;
        let mut far = (high - origin) / step;
        if near > far {
            std::mem::swap(&mut near, &mut far);
        }
        enter = enter.max(near);
        exit = exit.min(far);
        if enter > exit {
            return false;
        }
    }
    true
}
