//! Perimeter (wall) generation from layer parts.

use stratum_math::Micrometer;
use tracing::warn;

use crate::kernel::{BoolOp, FillRule, GeometryKernel, JoinStyle, KernelError};
use crate::path::{LayerPart, PartitionedLayer, Paths};

/// Wall loops of one region: `walls[wall][inset]` holds the contours
/// (outline first, then holes) of inset number `inset`, outermost first.
///
/// A wall that only appears once the region splits starts at a deeper
/// inset; its shallower entries are empty.
pub type PartInsets = Vec<Vec<Paths>>;

/// Generate wall loops for every part of a layer.
///
/// The result is indexed `[part][wall][inset]`. A part whose insets cannot
/// be computed yields no walls; the rest of the layer is unaffected.
pub fn inset_layer(
    kernel: &dyn GeometryKernel,
    layer: &PartitionedLayer,
    extrusion_width: Micrometer,
    wall_count: usize,
) -> Vec<PartInsets> {
    layer
        .parts
        .iter()
        .enumerate()
        .map(
            |(index, part)| match inset_part(kernel, part, extrusion_width, wall_count) {
                Ok(walls) => walls,
                Err(err) => {
                    warn!(part = index, error = %err, "could not inset part");
                    Vec::new()
                }
            },
        )
        .collect()
}

/// Generate wall loops for one part.
///
/// Inset `i` runs along `w/2 + i·w` inside the part so each loop's
/// extrusion touches the previous one. Each piece of an inset continues
/// the wall whose previous loop encloses it; when an inset splits the
/// region, the extra pieces open new walls at that depth. Stops at the
/// first inset that collapses.
pub fn inset_part(
    kernel: &dyn GeometryKernel,
    part: &LayerPart,
    extrusion_width: Micrometer,
    wall_count: usize,
) -> Result<PartInsets, KernelError> {
    let contours = part.contours();
    let mut walls: PartInsets = Vec::new();

    for i in 0..wall_count {
        let distance = extrusion_width / 2 + i as Micrometer * extrusion_width;
        let inset = kernel.offset(&contours, JoinStyle::Square, -distance)?;
        if inset.is_empty() {
            break;
        }

        let pieces = kernel
            .boolean(&inset, true, &[], BoolOp::Union, FillRule::EvenOdd)?
            .into_parts();
        for piece in pieces {
            let wall = match parent_wall(&walls, i, &piece) {
                Some(j) => j,
                None => {
                    walls.push(vec![Paths::new(); i]);
                    walls.len() - 1
                }
            };
            walls[wall].push(piece.contours());
        }
    }

    Ok(walls)
}

/// Wall whose loop at inset `i - 1` encloses `piece` and that has no loop
/// at inset `i` yet.
fn parent_wall(walls: &PartInsets, i: usize, piece: &LayerPart) -> Option<usize> {
    let start = piece.outline.first()?;
    walls.iter().position(|wall| {
        wall.len() == i
            && i > 0
            && wall[i - 1]
                .first()
                .is_some_and(|outline| outline.contains(start))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{GeoKernel, PolyTree};
    use crate::path::{rectangle, Path};
    use stratum_math::MicroPoint;

    fn square(min: Micrometer, max: Micrometer) -> Path {
        rectangle(MicroPoint::new(min, min), MicroPoint::new(max, max))
    }

    fn assert_square_near(path: &Path, min: Micrometer, max: Micrometer) {
        let bbox = path.bounding_box().unwrap();
        assert!((bbox.min.x - min).abs() <= 2, "min {} != {}", bbox.min.x, min);
        assert!((bbox.max.x - max).abs() <= 2, "max {} != {}", bbox.max.x, max);
        assert!((bbox.min.y - min).abs() <= 2);
        assert!((bbox.max.y - max).abs() <= 2);
    }

    #[test]
    fn test_inset_square() {
        let kernel = GeoKernel::new();
        let layer = PartitionedLayer::new(vec![LayerPart::new(square(0, 10_000), Vec::new())]);
        let insets = inset_layer(&kernel, &layer, 400, 3);

        assert_eq!(insets.len(), 1);
        assert_eq!(insets[0].len(), 1);
        let wall = &insets[0][0];
        assert_eq!(wall.len(), 3);
        assert_square_near(&wall[0][0], 200, 9_800);
        assert_square_near(&wall[1][0], 600, 9_400);
        assert_square_near(&wall[2][0], 1_000, 9_000);
    }

    #[test]
    fn test_inset_keeps_holes() {
        let kernel = GeoKernel::new();
        let part = LayerPart::new(square(0, 20_000), vec![square(8_000, 12_000)]);
        let walls = inset_part(&kernel, &part, 400, 2).unwrap();

        assert_eq!(walls.len(), 1);
        assert_eq!(walls[0].len(), 2);
        for inset in &walls[0] {
            assert_eq!(inset.len(), 2);
        }
        assert_square_near(&walls[0][0][1], 7_800, 12_200);
    }

    #[test]
    fn test_inset_stops_when_collapsed() {
        let kernel = GeoKernel::new();
        let part = LayerPart::new(square(0, 1_000), Vec::new());
        let walls = inset_part(&kernel, &part, 400, 3).unwrap();
        assert_eq!(walls.len(), 1);
        assert_eq!(walls[0].len(), 1);

        let tiny = LayerPart::new(square(0, 300), Vec::new());
        assert!(inset_part(&kernel, &tiny, 400, 3).unwrap().is_empty());
    }

    fn dumbbell() -> LayerPart {
        // Two 10 mm squares joined by a 1 mm bridge along y = 4.5..5.5 mm.
        LayerPart::new(
            Path::new(vec![
                MicroPoint::new(0, 0),
                MicroPoint::new(10_000, 0),
                MicroPoint::new(10_000, 4_500),
                MicroPoint::new(20_000, 4_500),
                MicroPoint::new(20_000, 0),
                MicroPoint::new(30_000, 0),
                MicroPoint::new(30_000, 10_000),
                MicroPoint::new(20_000, 10_000),
                MicroPoint::new(20_000, 5_500),
                MicroPoint::new(10_000, 5_500),
                MicroPoint::new(10_000, 10_000),
                MicroPoint::new(0, 10_000),
            ]),
            Vec::new(),
        )
    }

    #[test]
    fn test_split_region_keeps_inset_depth() {
        let kernel = GeoKernel::new();
        let walls = inset_part(&kernel, &dumbbell(), 400, 3).unwrap();

        // Inset 0 still spans the bridge; inset 1 splits into two lobes.
        assert_eq!(walls.len(), 2);
        assert_eq!(walls[0].len(), 3);
        assert_eq!(walls[1].len(), 3);
        assert_eq!(walls[0][0].len(), 1);
        assert!(walls[1][0].is_empty());

        let whole = walls[0][0][0].bounding_box().unwrap();
        assert!(whole.width() > 29_000);

        // Each wall stays on one lobe from the split onwards.
        for wall in &walls {
            let left = wall[1][0].bounding_box().unwrap().max.x < 15_000;
            for inset in &wall[1..] {
                let bbox = inset[0].bounding_box().unwrap();
                assert_eq!(bbox.max.x < 15_000, left);
            }
        }
        let lobe = walls[1][1][0].bounding_box().unwrap();
        assert!((lobe.max.y - lobe.min.y - 8_800).abs() <= 2);
    }

    #[test]
    fn test_zero_walls() {
        let kernel = GeoKernel::new();
        let layer = PartitionedLayer::new(vec![LayerPart::new(square(0, 10_000), Vec::new())]);
        let insets = inset_layer(&kernel, &layer, 400, 0);
        assert_eq!(insets, vec![Vec::<Vec<Paths>>::new()]);
    }

    #[test]
    fn test_failure_is_contained() {
        struct OffsetFails;

        impl GeometryKernel for OffsetFails {
            fn boolean(
                &self,
                _subject: &[Path],
                _subject_closed: bool,
                _clip: &[Path],
                _op: BoolOp,
                _fill_rule: FillRule,
            ) -> Result<PolyTree, KernelError> {
                Ok(PolyTree::default())
            }

            fn offset(
                &self,
                _paths: &[Path],
                _join: JoinStyle,
                _distance: Micrometer,
            ) -> Result<Paths, KernelError> {
                Err(KernelError::UnsupportedOperation("offset"))
            }
        }

        let layer = PartitionedLayer::new(vec![
            LayerPart::new(square(0, 10_000), Vec::new()),
            LayerPart::new(square(20_000, 30_000), Vec::new()),
        ]);
        let insets = inset_layer(&OffsetFails, &layer, 400, 2);
        assert_eq!(insets.len(), 2);
        assert!(insets.iter().all(Vec::is_empty));
    }
}
