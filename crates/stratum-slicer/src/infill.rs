//! Infill pattern generation.
//!
//! A [`LinearPattern`] lays a fixed grid of parallel lines over the whole
//! print area once, then clips that grid per region. Even layers use the
//! vertical grid and odd layers the horizontal one, so consecutive layers
//! cross at right angles.

use stratum_math::{MicroPoint, Micrometer};

use crate::error::{Result, SlicerError};
use crate::kernel::{BoolOp, FillRule, GeometryKernel, JoinStyle, KernelError};
use crate::path::{LayerPart, Path, Paths};

/// Per-call parameters for [`Pattern::fill`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FillSettings {
    /// Extrusion line width (µm).
    pub line_width: Micrometer,
    /// How far the fill reaches into the surrounding walls, in percent of
    /// the line width.
    pub overlap_percent: i32,
    /// Extra overlap (percent) applied only to the region's own outline,
    /// not to the outer boundary.
    pub additional_internal_overlap: i32,
}

impl FillSettings {
    /// Settings without any additional internal overlap.
    pub fn new(line_width: Micrometer, overlap_percent: i32) -> Self {
        Self {
            line_width,
            overlap_percent,
            additional_internal_overlap: 0,
        }
    }

    /// Inset applied to the region before the first clip.
    pub fn inside_overlap(&self) -> Micrometer {
        scaled_overlap(
            self.line_width,
            self.overlap_percent + self.additional_internal_overlap,
        )
    }

    /// Inset applied to the boundary before the second clip.
    pub fn perimeter_overlap(&self) -> Micrometer {
        scaled_overlap(self.line_width, self.overlap_percent)
    }
}

fn scaled_overlap(line_width: Micrometer, percent: i32) -> Micrometer {
    (line_width as f64 * (100.0 - percent as f64) / 100.0).round() as Micrometer
}

/// Result of filling one region.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Infill {
    /// Fill segments, each a 2-point line, sorted by the X of the first point.
    pub lines: Paths,
    /// The boundary the segments were finally clipped against. Always an
    /// unclassified part with no layer.
    pub boundary: LayerPart,
}

/// A fill pattern that can be clipped to a region.
pub trait Pattern: Send + Sync {
    /// Fill `part` on layer `layer_nr`.
    ///
    /// `boundary` limits how far the fill may reach; without one the part
    /// itself is the boundary.
    fn fill(
        &self,
        kernel: &dyn GeometryKernel,
        layer_nr: usize,
        part: &LayerPart,
        boundary: Option<&LayerPart>,
        settings: &FillSettings,
    ) -> std::result::Result<Infill, KernelError>;
}

/// Alternating grid of straight lines covering a bounding box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinearPattern {
    vertical: Paths,
    horizontal: Paths,
}

impl LinearPattern {
    /// Precompute both grids for the box `min..=max` with `line_width` spacing.
    pub fn new(min: MicroPoint, max: MicroPoint, line_width: Micrometer) -> Result<Self> {
        if line_width <= 0 {
            return Err(SlicerError::InvalidSettings(format!(
                "infill line spacing must be positive, got {line_width}"
            )));
        }

        let vertical = scan(min.x, max.x, line_width)
            .enumerate()
            .map(|(i, x)| {
                let (from, to) = alternate(i, min.y, max.y);
                Path::new(vec![MicroPoint::new(x, from), MicroPoint::new(x, to)])
            })
            .collect();

        let horizontal = scan(min.y, max.y, line_width)
            .enumerate()
            .map(|(i, y)| {
                let (from, to) = alternate(i, min.x, max.x);
                Path::new(vec![MicroPoint::new(from, y), MicroPoint::new(to, y)])
            })
            .collect();

        Ok(Self {
            vertical,
            horizontal,
        })
    }

    /// Lines at constant X.
    pub fn vertical(&self) -> &Paths {
        &self.vertical
    }

    /// Lines at constant Y.
    pub fn horizontal(&self) -> &Paths {
        &self.horizontal
    }

    /// The grid used on the given layer.
    pub fn lines_for_layer(&self, layer_nr: usize) -> &Paths {
        if layer_nr.is_multiple_of(2) {
            &self.vertical
        } else {
            &self.horizontal
        }
    }

    /// Clip this layer's grid against the region shrunk by the inside overlap.
    fn raw_infill(
        &self,
        kernel: &dyn GeometryKernel,
        layer_nr: usize,
        part: &LayerPart,
        overlap: Micrometer,
    ) -> std::result::Result<Paths, KernelError> {
        let mut clip = vec![part.outline.clone()];
        let mut holes = part.holes.clone();

        if overlap != 0 {
            clip = kernel.offset(&clip, JoinStyle::Square, -overlap)?;
            holes = kernel.offset(&holes, JoinStyle::Square, overlap)?;
        }
        clip.extend(holes);

        let tree = kernel.boolean(
            self.lines_for_layer(layer_nr),
            false,
            &clip,
            BoolOp::Intersection,
            FillRule::EvenOdd,
        )?;
        Ok(tree.contours())
    }
}

impl Pattern for LinearPattern {
    fn fill(
        &self,
        kernel: &dyn GeometryKernel,
        layer_nr: usize,
        part: &LayerPart,
        boundary: Option<&LayerPart>,
        settings: &FillSettings,
    ) -> std::result::Result<Infill, KernelError> {
        let inside_overlap = settings.inside_overlap();
        let perimeter_overlap = settings.perimeter_overlap();

        let raw = self.raw_infill(kernel, layer_nr, part, inside_overlap)?;

        let boundary = boundary.unwrap_or(part);
        let boundary = if perimeter_overlap != 0 {
            let contours =
                kernel.offset(&boundary.contours(), JoinStyle::Square, -perimeter_overlap)?;
            LayerPart::from_contours(contours)
        } else {
            LayerPart::new(boundary.outline.clone(), boundary.holes.clone())
        };

        let tree = kernel.boolean(
            &raw,
            false,
            &boundary.contours(),
            BoolOp::Intersection,
            FillRule::EvenOdd,
        )?;

        let mut lines = Vec::with_capacity(tree.len());
        for piece in tree.into_parts() {
            assert!(
                piece.holes.is_empty(),
                "clipped fill lines must not contain holes"
            );
            debug_assert!(
                is_straight(&piece.outline),
                "clipped fill line bends: {:?}",
                piece.outline.points
            );
            if let (Some(first), Some(last)) = (piece.outline.first(), piece.outline.last()) {
                lines.push(Path::new(vec![*first, *last]));
            }
        }
        lines.sort_by_key(|line| line.points[0].x);

        Ok(Infill { lines, boundary })
    }
}

/// Whether every point of `path` lies within 2 µm of the line through its
/// endpoints. Clipping a straight line may add intermediate points; it never
/// bends it.
fn is_straight(path: &Path) -> bool {
    let (Some(a), Some(b)) = (path.first(), path.last()) else {
        return true;
    };
    let (dx, dy) = ((b.x - a.x) as f64, (b.y - a.y) as f64);
    let length = dx.hypot(dy);
    path.points.iter().all(|p| {
        let (px, py) = ((p.x - a.x) as f64, (p.y - a.y) as f64);
        let off = if length == 0.0 {
            px.hypot(py)
        } else {
            (dx * py - dy * px).abs() / length
        };
        off <= 2.0
    })
}

/// Scan coordinates `min, min + step, ...` up to and including `max`.
fn scan(min: Micrometer, max: Micrometer, step: Micrometer) -> impl Iterator<Item = Micrometer> {
    std::iter::successors(Some(min), move |v| Some(v + step)).take_while(move |v| *v <= max)
}

/// Even lines run low to high, odd lines high to low.
fn alternate(index: usize, low: Micrometer, high: Micrometer) -> (Micrometer, Micrometer) {
    if index % 2 == 1 {
        (high, low)
    } else {
        (low, high)
    }
}
