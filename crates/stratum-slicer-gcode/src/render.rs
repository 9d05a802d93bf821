//! Renderers: per-layer stages that turn metadata into G-code.

use stratum_math::Micrometer;
use stratum_slicer::Options;
use tracing::warn;

use crate::builder::GcodeBuilder;
use crate::metadata::LayerMetadata;

/// A per-layer output stage.
///
/// Renderers run sequentially, in registration order, once per layer in
/// ascending layer order.
pub trait Renderer {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Emit the commands of `layer_nr` at height `z`.
    fn render(
        &self,
        builder: &mut GcodeBuilder,
        layer_nr: usize,
        metadata: &[LayerMetadata],
        z: Micrometer,
        options: &Options,
    );
}

/// Marks the layer and sets its feed and extrusion geometry.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreLayerRenderer;

impl Renderer for PreLayerRenderer {
    fn name(&self) -> &'static str {
        "pre layer"
    }

    fn render(
        &self,
        builder: &mut GcodeBuilder,
        layer_nr: usize,
        _metadata: &[LayerMetadata],
        _z: Micrometer,
        options: &Options,
    ) {
        builder.add_comment(&format!("LAYER:{layer_nr}"));
        builder.set_extrude_speed(options.layer_speed_of(layer_nr));
        builder.set_extrusion(
            options.layer_thickness_of(layer_nr),
            options.printer.extrusion_width,
            options.filament.diameter,
        );
    }
}

/// Switches the part cooling fan on at the configured layer.
#[derive(Debug, Clone, Copy, Default)]
pub struct FanControlRenderer;

impl Renderer for FanControlRenderer {
    fn name(&self) -> &'static str {
        "fan control"
    }

    fn render(
        &self,
        builder: &mut GcodeBuilder,
        layer_nr: usize,
        _metadata: &[LayerMetadata],
        _z: Micrometer,
        options: &Options,
    ) {
        if layer_nr == options.print.fan_start_layer {
            builder.add_command("M106 ; enable fan");
        }
    }
}

/// Traces the wall loops, outer first.
#[derive(Debug, Clone, Copy, Default)]
pub struct PerimeterRenderer;

impl Renderer for PerimeterRenderer {
    fn name(&self) -> &'static str {
        "perimeters"
    }

    fn render(
        &self,
        builder: &mut GcodeBuilder,
        layer_nr: usize,
        metadata: &[LayerMetadata],
        z: Micrometer,
        _options: &Options,
    ) {
        let Some(perimeters) = metadata.get(layer_nr).and_then(|m| m.perimeters.as_ref()) else {
            warn!(layer = layer_nr, renderer = self.name(), "no perimeters");
            return;
        };

        for (i, bucket) in perimeters.buckets().into_iter().enumerate() {
            builder.add_comment(if i == 0 {
                "TYPE:WALL-OUTER"
            } else {
                "TYPE:WALL-INNER"
            });
            for wall in bucket {
                for path in &wall.paths {
                    if let Some(speed) = wall.speed {
                        builder.set_extrude_speed(speed);
                    }
                    builder.add_polygon(path, z);
                }
            }
        }
    }
}

/// Traces the solid fill of the first layer. Every fill line goes out as
/// a closed traversal, so the nozzle returns along the segment.
#[derive(Debug, Clone, Copy, Default)]
pub struct BottomLayerRenderer;

impl Renderer for BottomLayerRenderer {
    fn name(&self) -> &'static str {
        "bottom layer"
    }

    fn render(
        &self,
        builder: &mut GcodeBuilder,
        layer_nr: usize,
        metadata: &[LayerMetadata],
        z: Micrometer,
        _options: &Options,
    ) {
        let Some(groups) = metadata.get(layer_nr).and_then(|m| m.bottom_layer.as_ref()) else {
            return;
        };

        builder.add_comment("bottomLayer");
        for line in groups.iter().flatten() {
            builder.add_polygon(line, z);
        }
    }
}
