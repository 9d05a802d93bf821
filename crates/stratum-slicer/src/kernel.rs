//! Polygon boolean and offset operations.
//!
//! The toolpath code only talks to [`GeometryKernel`]. [`GeoKernel`] is the
//! shipped implementation, backed by the `geo` crate's i_overlay engine;
//! micrometer coordinates are passed 1:1 as `f64` and rounded back.

use geo::bool_ops::FillRule as GeoFillRule;
use geo::buffer::{BufferStyle, LineJoin};
use geo::{
    BooleanOps, Buffer, Coord, LineString, MultiLineString, MultiPolygon, OpType, Polygon,
};
use stratum_math::{MicroPoint, Micrometer};
use thiserror::Error;

use crate::path::{LayerPart, Path, Paths};

/// Largest coordinate magnitude the kernel accepts (2^45 µm, about 35 000 km).
/// Beyond this the `f64` round trip is no longer exact.
pub const MAX_COORDINATE: Micrometer = 1 << 45;

/// Errors reported by a geometry kernel.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KernelError {
    /// An input coordinate is outside the kernel's working range.
    #[error("coordinate {0} is outside the kernel's working range")]
    CoordinateOutOfRange(Micrometer),

    /// The kernel does not implement the requested combination.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(&'static str),
}

/// Boolean operation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    /// Area (or line pieces) covered by both operands.
    Intersection,
    /// Area covered by either operand.
    Union,
    /// Subject minus clip.
    Difference,
    /// Area covered by exactly one operand.
    Xor,
}

/// How the inside of a set of contours is decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillRule {
    /// Inside when a ray crosses an odd number of contours.
    #[default]
    EvenOdd,
    /// Inside when the winding number is non-zero.
    NonZero,
}

/// Corner treatment when offsetting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinStyle {
    /// Mitered corners with a 45 degree limit: a corner whose angle is
    /// below 45 degrees is cut flat where a 45 degree miter would end.
    /// Right angles stay sharp.
    #[default]
    Square,
    /// Rounded corners.
    Round,
    /// Mitered corners, only cut flat below about 6 degrees.
    Miter,
}

/// One contour of a boolean result and the contours nested directly in it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolyNode {
    /// The contour.
    pub contour: Path,
    /// Holes of this contour (for closed results); always empty for open results.
    pub children: Vec<PolyNode>,
}

/// Hierarchical result of a boolean operation.
///
/// Closed results nest holes under their outline; open (line) results are
/// flat, one node per piece.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolyTree {
    /// Top-level contours.
    pub children: Vec<PolyNode>,
}

impl PolyTree {
    /// Number of top-level contours.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// True when the operation produced nothing.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Top-level contours, ignoring nesting.
    pub fn contours(&self) -> Paths {
        self.children.iter().map(|c| c.contour.clone()).collect()
    }

    /// Decompose into outline/holes groups. Islands nested inside holes
    /// become parts of their own.
    pub fn into_parts(self) -> Vec<LayerPart> {
        let mut parts = Vec::new();
        for node in self.children {
            collect_parts(node, &mut parts);
        }
        parts
    }
}

fn collect_parts(node: PolyNode, parts: &mut Vec<LayerPart>) {
    let mut holes = Vec::with_capacity(node.children.len());
    let mut islands = Vec::new();
    for hole in node.children {
        holes.push(hole.contour);
        islands.extend(hole.children);
    }
    parts.push(LayerPart::new(node.contour, holes));
    for island in islands {
        collect_parts(island, parts);
    }
}

/// Polygon boolean and offset capability.
///
/// Implementations must be reentrant; steps call into the kernel from
/// several threads at once.
pub trait GeometryKernel: Send + Sync {
    /// Combine `subject` with the closed `clip` contours.
    ///
    /// When `subject_closed` is false the subject paths are treated as open
    /// lines and the result is a flat tree of line pieces.
    fn boolean(
        &self,
        subject: &[Path],
        subject_closed: bool,
        clip: &[Path],
        op: BoolOp,
        fill_rule: FillRule,
    ) -> Result<PolyTree, KernelError>;

    /// Offset closed contours by `distance` (negative shrinks, positive
    /// grows). Contours nested inside others are holes (even-odd).
    fn offset(
        &self,
        paths: &[Path],
        join: JoinStyle,
        distance: Micrometer,
    ) -> Result<Paths, KernelError>;
}

/// [`GeometryKernel`] backed by `geo`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoKernel;

impl GeoKernel {
    /// Create the kernel.
    pub fn new() -> Self {
        Self
    }
}

impl GeometryKernel for GeoKernel {
    fn boolean(
        &self,
        subject: &[Path],
        subject_closed: bool,
        clip: &[Path],
        op: BoolOp,
        fill_rule: FillRule,
    ) -> Result<PolyTree, KernelError> {
        check_range(subject)?;
        check_range(clip)?;

        let clip_polygons = rings_to_multi_polygon(clip);
        let fill_rule = geo_fill_rule(fill_rule);

        if !subject_closed {
            let invert = match op {
                BoolOp::Intersection => false,
                BoolOp::Difference => true,
                BoolOp::Union | BoolOp::Xor => {
                    return Err(KernelError::UnsupportedOperation(
                        "union/xor with open subject paths",
                    ))
                }
            };
            let lines = open_paths_to_multi_line_string(subject);
            let clipped = clip_polygons.clip_with_fill_rule(&lines, invert, fill_rule);
            let children = clipped
                .0
                .iter()
                .map(|ls| PolyNode {
                    contour: open_path_from_line_string(ls),
                    children: Vec::new(),
                })
                .filter(|node| node.contour.len() >= 2)
                .collect();
            return Ok(PolyTree { children });
        }

        let subject_polygons = rings_to_multi_polygon(subject);
        let op_type = match op {
            BoolOp::Intersection => OpType::Intersection,
            BoolOp::Union => OpType::Union,
            BoolOp::Difference => OpType::Difference,
            BoolOp::Xor => OpType::Xor,
        };
        let result = subject_polygons.boolean_op_with_fill_rule(&clip_polygons, op_type, fill_rule);
        Ok(multi_polygon_to_tree(&result))
    }

    fn offset(
        &self,
        paths: &[Path],
        join: JoinStyle,
        distance: Micrometer,
    ) -> Result<Paths, KernelError> {
        check_range(paths)?;

        let rings = rings_to_multi_polygon(paths);
        if rings.0.is_empty() {
            return Ok(Vec::new());
        }

        // Resolve nesting first so holes keep their meaning regardless of the
        // winding the producer used.
        let empty: MultiPolygon<f64> = MultiPolygon::new(Vec::new());
        let resolved = rings.union_with_fill_rule(&empty, GeoFillRule::EvenOdd);

        let result = if distance == 0 {
            resolved
        } else {
            let style = BufferStyle::new(distance as f64).line_join(geo_line_join(join));
            resolved.buffer_with_style(style)
        };

        let mut contours = Vec::new();
        for polygon in result.iter() {
            let outline = closed_path_from_ring(polygon.exterior());
            if outline.len() < 3 {
                continue;
            }
            contours.push(outline);
            contours.extend(
                polygon
                    .interiors()
                    .iter()
                    .map(closed_path_from_ring)
                    .filter(|hole| hole.len() >= 3),
            );
        }
        Ok(contours)
    }
}

fn check_range(paths: &[Path]) -> Result<(), KernelError> {
    for p in paths.iter().flat_map(|path| path.points.iter()) {
        for v in [p.x, p.y] {
            if v.abs() > MAX_COORDINATE {
                return Err(KernelError::CoordinateOutOfRange(v));
            }
        }
    }
    Ok(())
}

fn geo_fill_rule(rule: FillRule) -> GeoFillRule {
    match rule {
        FillRule::EvenOdd => GeoFillRule::EvenOdd,
        FillRule::NonZero => GeoFillRule::NonZero,
    }
}

fn geo_line_join(join: JoinStyle) -> LineJoin<f64> {
    match join {
        JoinStyle::Square => LineJoin::Miter(std::f64::consts::FRAC_PI_4),
        JoinStyle::Round => LineJoin::Round(0.2),
        JoinStyle::Miter => LineJoin::Miter(0.1),
    }
}

fn to_coord(p: &MicroPoint) -> Coord<f64> {
    Coord {
        x: p.x as f64,
        y: p.y as f64,
    }
}

fn from_coord(c: &Coord<f64>) -> MicroPoint {
    MicroPoint::new(c.x.round() as Micrometer, c.y.round() as Micrometer)
}

/// Every contour with at least three points becomes its own polygon, so the
/// fill rule alone decides what is inside.
fn rings_to_multi_polygon(paths: &[Path]) -> MultiPolygon<f64> {
    let polygons = paths
        .iter()
        .filter(|path| path.len() >= 3)
        .map(|path| {
            let coords: Vec<Coord<f64>> = path.points.iter().map(to_coord).collect();
            Polygon::new(LineString::new(coords), Vec::new())
        })
        .collect();
    MultiPolygon::new(polygons)
}

fn open_paths_to_multi_line_string(paths: &[Path]) -> MultiLineString<f64> {
    let lines = paths
        .iter()
        .filter(|path| path.len() >= 2)
        .map(|path| LineString::new(path.points.iter().map(to_coord).collect()))
        .collect();
    MultiLineString::new(lines)
}

fn open_path_from_line_string(ls: &LineString<f64>) -> Path {
    let mut points: Vec<MicroPoint> = Vec::with_capacity(ls.0.len());
    for c in ls.coords() {
        let p = from_coord(c);
        if points.last() != Some(&p) {
            points.push(p);
        }
    }
    Path::new(points)
}

fn closed_path_from_ring(ls: &LineString<f64>) -> Path {
    let mut path = open_path_from_line_string(ls);
    if path.len() > 1 && path.first() == path.last() {
        path.points.pop();
    }
    path
}

fn multi_polygon_to_tree(mp: &MultiPolygon<f64>) -> PolyTree {
    let children = mp
        .iter()
        .map(|polygon| PolyNode {
            contour: closed_path_from_ring(polygon.exterior()),
            children: polygon
                .interiors()
                .iter()
                .map(|hole| PolyNode {
                    contour: closed_path_from_ring(hole),
                    children: Vec::new(),
                })
                .collect(),
        })
        .filter(|node| node.contour.len() >= 3)
        .collect();
    PolyTree { children }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::rectangle;

    fn square(min: Micrometer, max: Micrometer) -> Path {
        rectangle(MicroPoint::new(min, min), MicroPoint::new(max, max))
    }

    fn area_mm2(paths: &[Path]) -> f64 {
        // Even-odd paths: outline positive, holes negative, regardless of winding.
        let mut total = 0.0;
        for (i, p) in paths.iter().enumerate() {
            let a = (p.double_signed_area().abs() as f64) / 2.0 / 1e6;
            total += if i == 0 { a } else { -a };
        }
        total
    }

    #[test]
    fn test_offset_shrinks_square() {
        let kernel = GeoKernel::new();
        let result = kernel
            .offset(&[square(0, 10_000)], JoinStyle::Square, -1000)
            .unwrap();
        assert_eq!(result.len(), 1);
        let bbox = result[0].bounding_box().unwrap();
        assert!((bbox.min.x - 1000).abs() <= 1);
        assert!((bbox.max.x - 9000).abs() <= 1);
        assert!((area_mm2(&result) - 64.0).abs() < 0.1);
    }

    #[test]
    fn test_square_join_limits_miters() {
        let kernel = GeoKernel::new();

        // Right angles keep a full miter when growing.
        let grown = kernel
            .offset(&[square(0, 10_000)], JoinStyle::Square, 1000)
            .unwrap();
        assert_eq!(grown.len(), 1);
        let bbox = grown[0].bounding_box().unwrap();
        assert!((bbox.min.x + 1000).abs() <= 1);
        assert!((bbox.max.y - 11_000).abs() <= 1);
        assert!((area_mm2(&grown) - 144.0).abs() < 0.1);

        // A tip of about 11 degrees would reach x = 20 mm as a full miter;
        // the limit cuts it off within a few millimeters.
        let spike = Path::new(vec![
            MicroPoint::new(0, 0),
            MicroPoint::new(10_000, 0),
            MicroPoint::new(0, 2_000),
        ]);
        let grown = kernel.offset(&[spike], JoinStyle::Square, 1000).unwrap();
        let bbox = grown[0].bounding_box().unwrap();
        assert!(bbox.max.x > 10_500 && bbox.max.x < 15_000);
    }

    #[test]
    fn test_offset_collapses_to_nothing() {
        let kernel = GeoKernel::new();
        let result = kernel
            .offset(&[square(0, 1000)], JoinStyle::Square, -800)
            .unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_offset_keeps_holes() {
        let kernel = GeoKernel::new();
        // The hole winds the same way as the outline; nesting decides.
        let result = kernel
            .offset(
                &[square(0, 20_000), square(8_000, 12_000)],
                JoinStyle::Square,
                -1000,
            )
            .unwrap();
        assert_eq!(result.len(), 2);
        let outline = result[0].bounding_box().unwrap();
        let hole = result[1].bounding_box().unwrap();
        assert!((outline.width() - 18_000).abs() <= 2);
        assert!((hole.width() - 6_000).abs() <= 2);
    }

    #[test]
    fn test_offset_empty_input() {
        let kernel = GeoKernel::new();
        assert!(kernel.offset(&[], JoinStyle::Square, -100).unwrap().is_empty());
        let degenerate = Path::new(vec![MicroPoint::new(0, 0), MicroPoint::new(10, 0)]);
        assert!(kernel
            .offset(&[degenerate], JoinStyle::Square, -100)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_clip_open_lines() {
        let kernel = GeoKernel::new();
        let line = Path::new(vec![MicroPoint::new(5_000, -5_000), MicroPoint::new(5_000, 15_000)]);
        let tree = kernel
            .boolean(
                &[line],
                false,
                &[square(0, 10_000)],
                BoolOp::Intersection,
                FillRule::EvenOdd,
            )
            .unwrap();
        assert_eq!(tree.len(), 1);
        let piece = &tree.children[0].contour;
        assert!(tree.children[0].children.is_empty());
        let ys: Vec<Micrometer> = piece.points.iter().map(|p| p.y).collect();
        assert_eq!(*ys.iter().min().unwrap(), 0);
        assert_eq!(*ys.iter().max().unwrap(), 10_000);
        assert!(piece.points.iter().all(|p| p.x == 5_000));
    }

    #[test]
    fn test_clip_open_lines_even_odd_hole() {
        let kernel = GeoKernel::new();
        let line = Path::new(vec![MicroPoint::new(10_000, 0), MicroPoint::new(10_000, 20_000)]);
        let tree = kernel
            .boolean(
                &[line],
                false,
                &[square(0, 20_000), square(8_000, 12_000)],
                BoolOp::Intersection,
                FillRule::EvenOdd,
            )
            .unwrap();
        // The hole splits the line in two.
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_open_union_unsupported() {
        let kernel = GeoKernel::new();
        let line = Path::new(vec![MicroPoint::new(0, 0), MicroPoint::new(1, 1)]);
        let err = kernel
            .boolean(&[line], false, &[square(0, 10)], BoolOp::Union, FillRule::EvenOdd)
            .unwrap_err();
        assert!(matches!(err, KernelError::UnsupportedOperation(_)));
    }

    #[test]
    fn test_closed_intersection_tree() {
        let kernel = GeoKernel::new();
        let tree = kernel
            .boolean(
                &[square(0, 10_000)],
                true,
                &[square(5_000, 15_000)],
                BoolOp::Intersection,
                FillRule::EvenOdd,
            )
            .unwrap();
        let parts = tree.into_parts();
        assert_eq!(parts.len(), 1);
        assert!(parts[0].holes.is_empty());
        let bbox = parts[0].outline.bounding_box().unwrap();
        assert_eq!(bbox.min, MicroPoint::new(5_000, 5_000));
        assert_eq!(bbox.max, MicroPoint::new(10_000, 10_000));
    }

    #[test]
    fn test_difference_produces_hole() {
        let kernel = GeoKernel::new();
        let tree = kernel
            .boolean(
                &[square(0, 10_000)],
                true,
                &[square(4_000, 6_000)],
                BoolOp::Difference,
                FillRule::EvenOdd,
            )
            .unwrap();
        let parts = tree.into_parts();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].holes.len(), 1);
    }

    #[test]
    fn test_out_of_range() {
        let kernel = GeoKernel::new();
        let huge = square(0, MAX_COORDINATE + 1);
        let err = kernel.offset(&[huge], JoinStyle::Square, -1).unwrap_err();
        assert_eq!(err, KernelError::CoordinateOutOfRange(MAX_COORDINATE + 1));
    }

    #[test]
    fn test_tree_into_parts_islands() {
        let island = PolyNode {
            contour: square(4, 6),
            children: Vec::new(),
        };
        let hole = PolyNode {
            contour: square(2, 8),
            children: vec![island],
        };
        let tree = PolyTree {
            children: vec![PolyNode {
                contour: square(0, 10),
                children: vec![hole],
            }],
        };
        let parts = tree.into_parts();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].holes, vec![square(2, 8)]);
        assert_eq!(parts[1].outline, square(4, 6));
        assert!(parts[1].holes.is_empty());
    }
}
