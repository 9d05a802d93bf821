//! Per-layer artifacts computed by the layer steps.

use stratum_math::Millimeter;
use stratum_slicer::Paths;

/// One wall loop (outline plus holes of an inset) and its feed rate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpeedPaths {
    /// Contours of the loop.
    pub paths: Paths,
    /// Feed rate (mm/s); `None` keeps whatever feed is active.
    pub speed: Option<Millimeter>,
}

impl SpeedPaths {
    /// Create a loop with a feed rate.
    pub fn new(paths: Paths, speed: Option<Millimeter>) -> Self {
        Self { paths, speed }
    }
}

/// Wall loops of a layer sorted by their position in the wall.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassifiedPerimeters {
    /// Outermost loop of every wall.
    pub outer: Vec<SpeedPaths>,
    /// Loops between the outermost and the innermost.
    pub middle: Vec<SpeedPaths>,
    /// Innermost loop of every wall with more than one loop.
    pub inner: Vec<SpeedPaths>,
}

impl ClassifiedPerimeters {
    /// The buckets in print order: outer, middle, inner.
    pub fn buckets(&self) -> [&[SpeedPaths]; 3] {
        [&self.outer, &self.middle, &self.inner]
    }

    /// Innermost non-empty bucket, falling back to middle and then outer.
    pub fn innermost(&self) -> &[SpeedPaths] {
        if !self.inner.is_empty() {
            &self.inner
        } else if !self.middle.is_empty() {
            &self.middle
        } else {
            &self.outer
        }
    }

    /// True when no bucket holds a loop.
    pub fn is_empty(&self) -> bool {
        self.outer.is_empty() && self.middle.is_empty() && self.inner.is_empty()
    }
}

/// Everything the steps computed for one layer.
///
/// A field is `None` until the step producing it has run for the layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerMetadata {
    /// Classified wall loops.
    pub perimeters: Option<ClassifiedPerimeters>,
    /// Solid fill lines of the first layer, one group per filled loop.
    pub bottom_layer: Option<Vec<Paths>>,
}
