//! Square edge falloff: sinks heights toward zero near the field's border,
//! turning an endless field into an island.

use terrain_core::{HeightCurve, Heightfield};

/// Subtract the falloff mask from every sample in place, clamping the result
/// to [0, 1]. The mask at a cell is `max(|nx|, |ny|)` for its normalized
/// [-1, 1] coordinates — 0 at the centre, 1 at the border — optionally
/// reshaped through `curve`. Applied once, at heightfield-generation time.
pub fn apply_falloff(field: &mut Heightfield, curve: Option<&HeightCurve>) {
    let width = field.width();
    let height = field.height();

    for y in 0..height {
        for x in 0..width {
            let nx = x as f32 / width as f32 * 2.0 - 1.0;
            let ny = y as f32 / height as f32 * 2.0 - 1.0;
            let mask = nx.abs().max(ny.abs());

            let drop = match curve {
                Some(curve) => curve.evaluate(mask),
                None => mask,
            };

            let value = (field.get(x, y) - drop).clamp(0.0, 1.0);
            field.set(x, y, value);
        }
    }
}
