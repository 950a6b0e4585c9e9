//! Level-of-detail ladder: mesh simplification vs. viewer distance.

use serde::{Deserialize, Serialize};

/// One rung of the LOD ladder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lod {
    /// Simplification level; 0 is full detail.
    pub level: u32,
    /// A chunk renders at this rung while the viewer is at most this far away.
    pub threshold_distance: f32,
}

impl Lod {
    pub fn new(level: u32, threshold_distance: f32) -> Self {
        Self { level, threshold_distance }
    }

    /// Heightfield sampling stride for this level: 1 at full detail,
    /// `level * 2` otherwise.
    pub fn stride(&self) -> usize {
        if self.level == 0 {
            1
        } else {
            self.level as usize * 2
        }
    }
}

/// Pick the ladder index for a viewer `distance`: the first rung whose
/// threshold covers the distance. Returns `ladder.len()` when the viewer is
/// beyond the last threshold, meaning the chunk is out of range.
pub fn select_lod(ladder: &[Lod], distance: f32) -> usize {
    for (index, lod) in ladder.iter().enumerate() {
        if distance <= lod.threshold_distance {
            return index;
        }
    }
    ladder.len()
}
