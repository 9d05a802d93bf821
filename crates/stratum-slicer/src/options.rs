//! Print options.
//!
//! Lengths are micrometers, speeds mm/s. Every field may be omitted in a
//! config file and falls back to its default.

use serde::{Deserialize, Serialize};
use stratum_math::{Micrometer, Millimeter};

use crate::error::{Result, SlicerError};

/// Machine parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrinterOptions {
    /// Width of one extruded line (µm).
    pub extrusion_width: Micrometer,
}

impl Default for PrinterOptions {
    fn default() -> Self {
        Self {
            extrusion_width: 400,
        }
    }
}

/// Filament parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilamentOptions {
    /// Filament diameter (µm).
    pub diameter: Micrometer,
}

impl Default for FilamentOptions {
    fn default() -> Self {
        Self { diameter: 1750 }
    }
}

/// Per-print parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrintOptions {
    /// Number of wall loops per region.
    pub wall_count: usize,
    /// Thickness of the first layer (µm).
    pub initial_layer_thickness: Micrometer,
    /// Thickness of every following layer (µm).
    pub layer_thickness: Micrometer,
    /// Print speed on the first layer (mm/s).
    pub initial_layer_speed: Millimeter,
    /// Print speed on every following layer (mm/s).
    pub layer_speed: Millimeter,
    /// Speed of the outermost wall above the first layer (mm/s).
    pub outer_perimeter_speed: Millimeter,
    /// Travel speed (mm/s).
    pub move_speed: Millimeter,
    /// How far infill reaches into the walls, in percent of the extrusion width.
    pub infill_overlap_percent: i32,
    /// Layer on which the part cooling fan is switched on.
    pub fan_start_layer: usize,
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self {
            wall_count: 3,
            initial_layer_thickness: 300,
            layer_thickness: 200,
            initial_layer_speed: 30.0,
            layer_speed: 60.0,
            outer_perimeter_speed: 40.0,
            move_speed: 150.0,
            infill_overlap_percent: 50,
            fan_start_layer: 2,
        }
    }
}

/// Complete option set for one generation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Machine parameters.
    pub printer: PrinterOptions,
    /// Filament parameters.
    pub filament: FilamentOptions,
    /// Per-print parameters.
    pub print: PrintOptions,
}

impl Options {
    /// Validate options.
    pub fn validate(&self) -> Result<()> {
        let positive_lengths = [
            ("printer.extrusion_width", self.printer.extrusion_width),
            ("filament.diameter", self.filament.diameter),
            ("print.initial_layer_thickness", self.print.initial_layer_thickness),
            ("print.layer_thickness", self.print.layer_thickness),
        ];
        for (name, value) in positive_lengths {
            if value <= 0 {
                return Err(SlicerError::InvalidSettings(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }

        let positive_speeds = [
            ("print.initial_layer_speed", self.print.initial_layer_speed),
            ("print.layer_speed", self.print.layer_speed),
            ("print.outer_perimeter_speed", self.print.outer_perimeter_speed),
            ("print.move_speed", self.print.move_speed),
        ];
        for (name, value) in positive_speeds {
            if !(value > 0.0 && value.is_finite()) {
                return Err(SlicerError::InvalidSettings(format!(
                    "{name} must be a positive speed, got {value}"
                )));
            }
        }

        if self.print.wall_count == 0 {
            return Err(SlicerError::InvalidSettings(
                "print.wall_count must be at least 1".into(),
            ));
        }
        if !(0..=100).contains(&self.print.infill_overlap_percent) {
            return Err(SlicerError::InvalidSettings(
                "print.infill_overlap_percent must be between 0 and 100".into(),
            ));
        }
        Ok(())
    }

    /// Z height of a layer's top (µm).
    pub fn layer_z(&self, layer_nr: usize) -> Micrometer {
        self.print.initial_layer_thickness + layer_nr as Micrometer * self.print.layer_thickness
    }

    /// Thickness of the given layer (µm).
    pub fn layer_thickness_of(&self, layer_nr: usize) -> Micrometer {
        if layer_nr == 0 {
            self.print.initial_layer_thickness
        } else {
            self.print.layer_thickness
        }
    }

    /// Print speed used on the given layer (mm/s).
    pub fn layer_speed_of(&self, layer_nr: usize) -> Millimeter {
        if layer_nr == 0 {
            self.print.initial_layer_speed
        } else {
            self.print.layer_speed
        }
    }
}
