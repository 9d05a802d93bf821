//! Layer steps: per-layer computations that fill [`LayerMetadata`].
//!
//! Steps run as a wavefront. Every layer passes through one step before the
//! next step starts, so a step may rely on earlier steps having populated
//! the same layer.

use stratum_slicer::{
    inset_layer, FillSettings, GeometryKernel, LayerPart, Options, PartitionedLayer, Pattern,
};
use tracing::{debug, warn};

use crate::metadata::{ClassifiedPerimeters, LayerMetadata, SpeedPaths};

/// Shared, read-only inputs of every step.
#[derive(Clone, Copy)]
pub struct StepContext<'a> {
    /// Options of the run.
    pub options: &'a Options,
    /// Geometry kernel.
    pub kernel: &'a dyn GeometryKernel,
    /// Infill pattern covering the whole print.
    pub pattern: &'a dyn Pattern,
}

/// A per-layer computation.
///
/// `run` receives the metadata of all layers as left by the previous step
/// and returns the new metadata of `layer_nr`. Implementations may only
/// read their own layer's entry; layers are processed in parallel.
pub trait LayerStep: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Compute the metadata of one layer.
    fn run(
        &self,
        layer_nr: usize,
        layers: &[PartitionedLayer],
        metadata: &[LayerMetadata],
        ctx: &StepContext<'_>,
    ) -> LayerMetadata;
}

/// Generates wall loops and classifies them as outer, middle or inner.
#[derive(Debug, Clone, Copy, Default)]
pub struct PerimeterStep;

impl LayerStep for PerimeterStep {
    fn name(&self) -> &'static str {
        "perimeters"
    }

    fn run(
        &self,
        layer_nr: usize,
        layers: &[PartitionedLayer],
        metadata: &[LayerMetadata],
        ctx: &StepContext<'_>,
    ) -> LayerMetadata {
        let print = &ctx.options.print;
        let insets = inset_layer(
            ctx.kernel,
            &layers[layer_nr],
            ctx.options.printer.extrusion_width,
            print.wall_count,
        );

        // The first layer prints at the feed chosen by the pre-layer renderer.
        let (outer_speed, inner_speed) = if layer_nr == 0 {
            (None, None)
        } else {
            (Some(print.outer_perimeter_speed), Some(print.layer_speed))
        };

        let mut perimeters = ClassifiedPerimeters::default();
        for wall in insets.into_iter().flatten() {
            let last = wall.len().saturating_sub(1);
            for (inset_nr, paths) in wall.into_iter().enumerate() {
                if paths.is_empty() {
                    continue;
                }
                if inset_nr == 0 {
                    perimeters.outer.push(SpeedPaths::new(paths, outer_speed));
                } else if inset_nr < last {
                    perimeters.middle.push(SpeedPaths::new(paths, inner_speed));
                } else {
                    perimeters.inner.push(SpeedPaths::new(paths, inner_speed));
                }
            }
        }

        debug!(
            layer = layer_nr,
            outer = perimeters.outer.len(),
            middle = perimeters.middle.len(),
            inner = perimeters.inner.len(),
            "classified perimeters"
        );

        LayerMetadata {
            perimeters: Some(perimeters),
            ..metadata[layer_nr].clone()
        }
    }
}

/// Fills the area inside the innermost walls of the first layer.
#[derive(Debug, Clone, Copy, Default)]
pub struct BottomLayerStep;

impl LayerStep for BottomLayerStep {
    fn name(&self) -> &'static str {
        "bottom layer"
    }

    fn run(
        &self,
        layer_nr: usize,
        _layers: &[PartitionedLayer],
        metadata: &[LayerMetadata],
        ctx: &StepContext<'_>,
    ) -> LayerMetadata {
        let mut current = metadata[layer_nr].clone();
        if layer_nr != 0 {
            return current;
        }

        let Some(perimeters) = metadata[layer_nr].perimeters.as_ref() else {
            warn!(layer = layer_nr, step = self.name(), "no perimeters to fill");
            return current;
        };

        let settings = FillSettings::new(
            ctx.options.printer.extrusion_width,
            ctx.options.print.infill_overlap_percent,
        );

        let mut groups = Vec::new();
        for source in perimeters.innermost() {
            let part = LayerPart::from_contours(source.paths.clone());
            match ctx.pattern.fill(ctx.kernel, layer_nr, &part, None, &settings) {
                Ok(infill) if !infill.lines.is_empty() => groups.push(infill.lines),
                Ok(_) => {}
                Err(err) => {
                    warn!(layer = layer_nr, step = self.name(), error = %err, "fill failed");
                }
            }
        }

        debug!(layer = layer_nr, groups = groups.len(), "bottom layer filled");

        current.bottom_layer = Some(groups);
        current
    }
}
