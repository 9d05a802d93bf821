//! Layer geometry: paths, layer parts and partitioned layers.

use serde::{Deserialize, Serialize};
use stratum_math::{BoundingBox, MicroPoint};

/// An ordered sequence of points, open or closed.
///
/// Closed paths never repeat their first point.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path {
    /// Points in traversal order.
    pub points: Vec<MicroPoint>,
}

/// A set of paths.
pub type Paths = Vec<Path>;

impl Path {
    /// Create a path from points.
    pub fn new(points: Vec<MicroPoint>) -> Self {
        Self { points }
    }

    /// Check if the path is empty.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// First point.
    pub fn first(&self) -> Option<&MicroPoint> {
        self.points.first()
    }

    /// Last point.
    pub fn last(&self) -> Option<&MicroPoint> {
        self.points.last()
    }

    /// Twice the signed area, treating the path as closed.
    /// Positive for counter-clockwise winding.
    pub fn double_signed_area(&self) -> i128 {
        let n = self.points.len();
        if n < 3 {
            return 0;
        }
        let mut area: i128 = 0;
        for i in 0..n {
            let a = &self.points[i];
            let b = &self.points[(i + 1) % n];
            area += a.x as i128 * b.y as i128 - b.x as i128 * a.y as i128;
        }
        area
    }

    /// Whether `p` lies inside the path, treated as a closed ring
    /// (even-odd crossing test; points on the border may go either way).
    pub fn contains(&self, p: &MicroPoint) -> bool {
        let n = self.points.len();
        if n < 3 {
            return false;
        }

        let (px, py) = (p.x as f64, p.y as f64);
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let (xi, yi) = (self.points[i].x as f64, self.points[i].y as f64);
            let (xj, yj) = (self.points[j].x as f64, self.points[j].y as f64);
            if (yi > py) != (yj > py) && px < (xj - xi) * (py - yi) / (yj - yi) + xi {
                inside = !inside;
            }
            j = i;
        }
        inside
    }

    /// Bounding box of the path, `None` if it has no points.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(&self.points)
    }
}

impl From<Vec<MicroPoint>> for Path {
    fn from(points: Vec<MicroPoint>) -> Self {
        Self::new(points)
    }
}

/// Classification of a layer part, assigned by whoever produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartType {
    /// Nothing known about the part.
    #[default]
    Unknown,
    /// Part of a top surface.
    Top,
    /// Part of a bottom surface.
    Bottom,
}

/// One solid region of a layer: an outline with zero or more holes.
///
/// Holes are disjoint and lie inside the outline; this is established by
/// the producer and not re-checked here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerPart {
    /// Outer contour.
    pub outline: Path,
    /// Hole contours.
    #[serde(default)]
    pub holes: Paths,
    /// Classification.
    #[serde(default)]
    pub kind: PartType,
    /// Index of the layer this part belongs to; `None` when the part is not
    /// tied to a concrete layer.
    #[serde(default)]
    pub layer: Option<usize>,
}

impl LayerPart {
    /// Create an unclassified part.
    pub fn new(outline: Path, holes: Paths) -> Self {
        Self {
            outline,
            holes,
            kind: PartType::Unknown,
            layer: None,
        }
    }

    /// Attach the part to a layer.
    pub fn on_layer(mut self, layer: usize) -> Self {
        self.layer = Some(layer);
        self
    }

    /// Build a part from a flat contour list: the first path is the
    /// outline, every following path a hole.
    pub fn from_contours(mut contours: Paths) -> Self {
        if contours.is_empty() {
            return Self::default();
        }
        let outline = contours.remove(0);
        Self::new(outline, contours)
    }

    /// Outline followed by the holes, as one contour list.
    pub fn contours(&self) -> Paths {
        std::iter::once(self.outline.clone())
            .chain(self.holes.iter().cloned())
            .collect()
    }

    /// True when the outline has no points.
    pub fn is_empty(&self) -> bool {
        self.outline.is_empty()
    }
}

/// All parts of one layer, sharing a Z height.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartitionedLayer {
    /// Parts in the order the producer emitted them.
    pub parts: Vec<LayerPart>,
}

impl PartitionedLayer {
    /// Create a layer from parts.
    pub fn new(parts: Vec<LayerPart>) -> Self {
        Self { parts }
    }

    /// Bounding box of every outline, `None` if the layer is empty.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.parts.iter().flat_map(|p| p.outline.points.iter()))
    }
}

/// Bounding box of every outline of every layer.
pub fn layers_bounding_box(layers: &[PartitionedLayer]) -> Option<BoundingBox> {
    layers
        .iter()
        .filter_map(PartitionedLayer::bounding_box)
        .reduce(|mut acc, b| {
            acc.merge(&b);
            acc
        })
}

/// Axis-aligned rectangle as a counter-clockwise path.
pub fn rectangle(min: MicroPoint, max: MicroPoint) -> Path {
    Path::new(vec![
        MicroPoint::new(min.x, min.y),
        MicroPoint::new(max.x, min.y),
        MicroPoint::new(max.x, max.y),
        MicroPoint::new(min.x, max.y),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_area() {
        let square = rectangle(MicroPoint::new(0, 0), MicroPoint::new(1000, 1000));
        assert_eq!(square.double_signed_area(), 2_000_000);

        let mut cw = square.clone();
        cw.points.reverse();
        assert_eq!(cw.double_signed_area(), -2_000_000);
    }

    #[test]
    fn test_path_contains() {
        let square = rectangle(MicroPoint::new(0, 0), MicroPoint::new(1000, 1000));
        assert!(square.contains(&MicroPoint::new(500, 500)));
        assert!(square.contains(&MicroPoint::new(1, 999)));
        assert!(!square.contains(&MicroPoint::new(1500, 500)));
        assert!(!square.contains(&MicroPoint::new(500, -1)));

        // Concave: an L shape does not contain the notch.
        let l_shape = Path::new(vec![
            MicroPoint::new(0, 0),
            MicroPoint::new(1000, 0),
            MicroPoint::new(1000, 400),
            MicroPoint::new(400, 400),
            MicroPoint::new(400, 1000),
            MicroPoint::new(0, 1000),
        ]);
        assert!(l_shape.contains(&MicroPoint::new(200, 800)));
        assert!(!l_shape.contains(&MicroPoint::new(800, 800)));

        let line = Path::new(vec![MicroPoint::new(0, 0), MicroPoint::new(100, 100)]);
        assert!(!line.contains(&MicroPoint::new(50, 50)));
    }

    #[test]
    fn test_part_from_contours() {
        let outline = rectangle(MicroPoint::new(0, 0), MicroPoint::new(100, 100));
        let hole = rectangle(MicroPoint::new(40, 40), MicroPoint::new(60, 60));
        let part = LayerPart::from_contours(vec![outline.clone(), hole.clone()]);
        assert_eq!(part.outline, outline);
        assert_eq!(part.holes, vec![hole]);
        assert_eq!(part.kind, PartType::Unknown);
        assert_eq!(part.layer, None);
        assert_eq!(part.contours().len(), 2);

        assert!(LayerPart::from_contours(Vec::new()).is_empty());
    }

    #[test]
    fn test_layers_bounding_box() {
        let a = PartitionedLayer::new(vec![LayerPart::new(
            rectangle(MicroPoint::new(0, 0), MicroPoint::new(100, 100)),
            Vec::new(),
        )]);
        let b = PartitionedLayer::new(vec![LayerPart::new(
            rectangle(MicroPoint::new(-50, 20), MicroPoint::new(80, 300)),
            Vec::new(),
        )]);
        let bbox = layers_bounding_box(&[a, PartitionedLayer::default(), b]).unwrap();
        assert_eq!(bbox.min, MicroPoint::new(-50, 0));
        assert_eq!(bbox.max, MicroPoint::new(100, 300));
        assert!(layers_bounding_box(&[]).is_none());
    }

    #[test]
    fn test_part_serde() {
        let json = r#"{"outline": [[0, 0], [10, 0], [10, 10]], "kind": "bottom", "layer": 3}"#;
        let part: LayerPart = serde_json::from_str(json).unwrap();
        assert_eq!(part.outline.len(), 3);
        assert!(part.holes.is_empty());
        assert_eq!(part.kind, PartType::Bottom);
        assert_eq!(part.layer, Some(3));
    }
}
