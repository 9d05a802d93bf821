//! The generator: runs every layer step, then every renderer, and returns
//! the finished program.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use stratum_math::{MicroPoint, Millimeter};
use stratum_slicer::{
    layers_bounding_box, GeoKernel, GeometryKernel, LinearPattern, Options, PartitionedLayer,
    Result,
};
use tracing::{debug, info};

use crate::builder::GcodeBuilder;
use crate::metadata::LayerMetadata;
use crate::render::{
    BottomLayerRenderer, FanControlRenderer, PerimeterRenderer, PreLayerRenderer, Renderer,
};
use crate::steps::{BottomLayerStep, LayerStep, PerimeterStep, StepContext};

/// Machine priming sequence written after the header comment.
const PRIME_SEQUENCE: [&str; 5] = [
    "G1 X0 Y20 Z0.2 F3000 ; get ready to prime",
    "G92 E0 ; reset extrusion distance",
    "G1 X200 E20 F600 ; prime nozzle",
    "G1 Z5 F5000 ; lift nozzle",
    "G92 E0 ; reset extrusion distance",
];

/// Summary of a generated program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintStats {
    /// Number of layers rendered.
    pub layer_count: usize,
    /// Filament length extruded by the program (mm).
    pub filament_mm: Millimeter,
    /// Number of lines in the program.
    pub line_count: usize,
}

/// Turns partitioned layers into G-code.
pub struct Generator {
    options: Options,
    kernel: Box<dyn GeometryKernel>,
    steps: Vec<Box<dyn LayerStep>>,
    renderers: Vec<Box<dyn Renderer>>,
}

impl Generator {
    /// Generator with the `geo` kernel and the standard steps and renderers.
    pub fn new(options: Options) -> Self {
        Self::with_kernel(options, Box::new(GeoKernel::new()))
    }

    /// Generator with a custom kernel and the standard steps and renderers.
    pub fn with_kernel(options: Options, kernel: Box<dyn GeometryKernel>) -> Self {
        Self::empty(options, kernel)
            .with_step(PerimeterStep)
            .with_step(BottomLayerStep)
            .with_renderer(PreLayerRenderer)
            .with_renderer(FanControlRenderer)
            .with_renderer(PerimeterRenderer)
            .with_renderer(BottomLayerRenderer)
    }

    /// Generator without any steps or renderers.
    pub fn empty(options: Options, kernel: Box<dyn GeometryKernel>) -> Self {
        Self {
            options,
            kernel,
            steps: Vec::new(),
            renderers: Vec::new(),
        }
    }

    /// Append a layer step.
    pub fn with_step(mut self, step: impl LayerStep + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Append a renderer.
    pub fn with_renderer(mut self, renderer: impl Renderer + 'static) -> Self {
        self.renderers.push(Box::new(renderer));
        self
    }

    /// Generate the program for `layers` (index 0 printed first).
    pub fn generate(&self, layers: &[PartitionedLayer]) -> Result<String> {
        self.generate_with_stats(layers).map(|(gcode, _)| gcode)
    }

    /// Generate the program and report what it contains.
    pub fn generate_with_stats(
        &self,
        layers: &[PartitionedLayer],
    ) -> Result<(String, PrintStats)> {
        self.options.validate()?;

        let metadata = self.run_steps(layers)?;
        let (gcode, filament_mm) = self.render(layers, &metadata);

        let stats = PrintStats {
            layer_count: layers.len(),
            filament_mm,
            line_count: gcode.lines().count(),
        };
        info!(
            layers = stats.layer_count,
            filament_mm = stats.filament_mm,
            "generated G-code"
        );
        Ok((gcode, stats))
    }

    /// Run every step over every layer. Layers of one step run in
    /// parallel; a step starts only after the previous one has finished
    /// all layers.
    fn run_steps(&self, layers: &[PartitionedLayer]) -> Result<Vec<LayerMetadata>> {
        let bbox = layers_bounding_box(layers);
        let (min, max) = bbox.map_or((MicroPoint::origin(), MicroPoint::origin()), |b| {
            (b.min, b.max)
        });
        let pattern = LinearPattern::new(min, max, self.options.printer.extrusion_width)?;

        let ctx = StepContext {
            options: &self.options,
            kernel: self.kernel.as_ref(),
            pattern: &pattern,
        };

        let mut metadata = vec![LayerMetadata::default(); layers.len()];
        for step in &self.steps {
            debug!(step = step.name(), layers = layers.len(), "running step");
            metadata = (0..layers.len())
                .into_par_iter()
                .map(|layer_nr| step.run(layer_nr, layers, &metadata, &ctx))
                .collect();
        }
        Ok(metadata)
    }

    fn render(
        &self,
        layers: &[PartitionedLayer],
        metadata: &[LayerMetadata],
    ) -> (String, Millimeter) {
        let print = &self.options.print;
        let mut builder = GcodeBuilder::new(print.initial_layer_speed, print.move_speed);

        builder.add_comment("Generated with stratum");
        for command in PRIME_SEQUENCE {
            builder.add_command(command);
        }
        builder.set_extrusion(
            print.initial_layer_thickness,
            self.options.printer.extrusion_width,
            self.options.filament.diameter,
        );

        for layer_nr in 0..layers.len() {
            let z = self.options.layer_z(layer_nr);
            for renderer in &self.renderers {
                renderer.render(&mut builder, layer_nr, metadata, z, &self.options);
            }
        }

        builder.set_extrusion(
            print.layer_thickness,
            self.options.printer.extrusion_width,
            self.options.filament.diameter,
        );
        // The start of the print never switches the fan off, yet the end
        // sends M107 labelled as enabling it. Kept as emitted.
        builder.add_command("M107 ; enable fan");

        let filament = builder.extruded();
        (builder.finish(), filament)
    }
}
