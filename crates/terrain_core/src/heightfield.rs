//! Dense 2D grid of elevation samples.

/// Row-major grid of `f32` elevation values.
///
/// The index convention is `y * width + x` everywhere in the workspace; no
/// caller is allowed to flip the axes. Values are in [0, 1] after Local or
/// Global normalization and unbounded otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct Heightfield {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl Heightfield {
    /// Create a grid with every sample set to `value`.
    pub fn filled(width: usize, height: usize, value: f32) -> Self {
        Self { width, height, data: vec![value; width * height] }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Sample at `(x, y)`. Panics on out-of-range coordinates.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        debug_assert!(x < self.width && y < self.height);
        self.data[y * self.width + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: f32) {
        debug_assert!(x < self.width && y < self.height);
        self.data[y * self.width + x] = value;
    }

    /// All samples in row-major order.
    pub fn values(&self) -> &[f32] {
        &self.data
    }

    pub fn values_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }
}
