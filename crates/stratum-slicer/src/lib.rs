#![warn(missing_docs)]

//! Toolpath geometry for layer-based 3D printing.
//!
//! This crate turns per-layer polygon regions into wall loops and infill
//! lines. All geometry is integer micrometers; polygon booleans and
//! offsets go through the [`GeometryKernel`] trait.
//!
//! # Example
//!
//! ```ignore
//! use stratum_slicer::{FillSettings, GeoKernel, LinearPattern, Pattern};
//!
//! let kernel = GeoKernel::new();
//! let pattern = LinearPattern::new(bbox.min, bbox.max, 400)?;
//! let infill = pattern.fill(&kernel, layer_nr, &part, None, &FillSettings::new(400, 50))?;
//!
//! println!("{} fill lines", infill.lines.len());
//! ```

pub mod error;
pub mod infill;
pub mod kernel;
pub mod options;
pub mod path;
pub mod perimeter;

pub use error::{Result, SlicerError};
pub use infill::{FillSettings, Infill, LinearPattern, Pattern};
pub use kernel::{
    BoolOp, FillRule, GeoKernel, GeometryKernel, JoinStyle, KernelError, PolyNode, PolyTree,
};
pub use options::{FilamentOptions, Options, PrintOptions, PrinterOptions};
pub use path::{
    layers_bounding_box, rectangle, LayerPart, PartType, PartitionedLayer, Path, Paths,
};
pub use perimeter::{inset_layer, inset_part, PartInsets};
