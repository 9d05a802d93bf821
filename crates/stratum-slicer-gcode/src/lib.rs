#![warn(missing_docs)]

//! G-code generation for the stratum slicer.
//!
//! Generation runs in two phases. Layer steps compute per-layer artifacts
//! (classified wall loops, first-layer fill) into [`LayerMetadata`]; then
//! renderers walk the layers in order and write commands through a single
//! [`GcodeBuilder`].
//!
//! # Example
//!
//! ```ignore
//! use stratum_slicer::Options;
//! use stratum_slicer_gcode::Generator;
//!
//! let layers: Vec<PartitionedLayer> = // ... from the slicing stage
//! let gcode = Generator::new(Options::default()).generate(&layers)?;
//! std::fs::write("output.gcode", gcode)?;
//! ```

pub mod builder;
pub mod generator;
pub mod metadata;
pub mod render;
pub mod steps;

pub use builder::GcodeBuilder;
pub use generator::{Generator, PrintStats};
pub use metadata::{ClassifiedPerimeters, LayerMetadata, SpeedPaths};
pub use render::{
    BottomLayerRenderer, FanControlRenderer, PerimeterRenderer, PreLayerRenderer, Renderer,
};
pub use steps::{BottomLayerStep, LayerStep, PerimeterStep, StepContext};
