//! G-code text accumulation.
//!
//! [`GcodeBuilder`] owns the output text and the machine state needed to
//! write it: active feed rates, the last emitted `F` and `Z`, the current
//! position and the cumulative filament length. Coordinates come in as
//! micrometers and leave as millimeters.

use std::f64::consts::PI;

use stratum_math::{
    at_height, distance_mm, to_millimeter, MicroPoint, MicroVec3, Micrometer, Millimeter,
};
use stratum_slicer::Path;

/// Accumulates G-code for one print.
#[derive(Debug, Clone)]
pub struct GcodeBuilder {
    content: String,
    /// Feed for extrusion moves (mm/s).
    extrude_speed: Millimeter,
    /// Feed for travel moves (mm/s).
    move_speed: Millimeter,
    /// Feed last written to the output, `None` when unknown.
    current_feed: Option<Millimeter>,
    /// Z last written to the output, `None` when unknown.
    current_z: Option<Micrometer>,
    position: Option<MicroVec3>,
    /// Filament length per millimeter of extruded line.
    extrusion_per_mm: f64,
    /// Absolute E value.
    extruded: Millimeter,
}

impl GcodeBuilder {
    /// Create an empty builder. Speeds are mm/s.
    pub fn new(extrude_speed: Millimeter, move_speed: Millimeter) -> Self {
        Self {
            content: String::new(),
            extrude_speed,
            move_speed,
            current_feed: None,
            current_z: None,
            position: None,
            extrusion_per_mm: 0.0,
            extruded: 0.0,
        }
    }

    /// Append `;text`.
    pub fn add_comment(&mut self, text: &str) {
        self.content.push(';');
        self.content.push_str(text);
        self.content.push('\n');
    }

    /// Append a raw command line verbatim.
    ///
    /// The command may change feed or height behind the builder's back, so
    /// both are written again on the next move.
    pub fn add_command(&mut self, command: &str) {
        self.content.push_str(command);
        self.content.push('\n');
        self.current_feed = None;
        self.current_z = None;
    }

    /// Set the feed for subsequent extrusion moves (mm/s).
    pub fn set_extrude_speed(&mut self, speed: Millimeter) {
        self.extrude_speed = speed;
    }

    /// Set the line geometry used to compute E for subsequent moves.
    ///
    /// The filament pushed per millimeter of travel is chosen so the
    /// extruded volume equals `layer_thickness × width` per millimeter.
    pub fn set_extrusion(
        &mut self,
        layer_thickness: Micrometer,
        width: Micrometer,
        filament_diameter: Micrometer,
    ) {
        let radius = to_millimeter(filament_diameter) / 2.0;
        let filament_area = PI * radius * radius;
        self.extrusion_per_mm =
            to_millimeter(layer_thickness) * to_millimeter(width) / filament_area;
    }

    /// Trace a closed path at height `z`: travel to the first point, extrude
    /// along every edge and back to the start. A two-point path is
    /// extruded there and back.
    pub fn add_polygon(&mut self, path: &Path, z: Micrometer) {
        let mut points = path.points.iter();
        let Some(first) = points.next() else {
            return;
        };
        self.travel_to(first, z);
        for p in points {
            self.extrude_to(p, z);
        }
        if path.len() > 1 {
            self.extrude_to(first, z);
        }
    }

    /// Absolute filament length extruded so far (mm).
    pub fn extruded(&self) -> Millimeter {
        self.extruded
    }

    /// Consume the builder and return the program.
    pub fn finish(self) -> String {
        self.content
    }

    fn travel_to(&mut self, p: &MicroPoint, z: Micrometer) {
        self.write_move("G0", self.move_speed, p, z, None);
    }

    fn extrude_to(&mut self, p: &MicroPoint, z: Micrometer) {
        let length = self.position.map_or(0.0, |from| distance_mm(&from.xy(), p));
        self.extruded += length * self.extrusion_per_mm;
        self.write_move("G1", self.extrude_speed, p, z, Some(self.extruded));
    }

    fn write_move(
        &mut self,
        code: &str,
        speed: Millimeter,
        p: &MicroPoint,
        z: Micrometer,
        e: Option<Millimeter>,
    ) {
        let mut line = String::from(code);
        if self.current_feed != Some(speed) {
            line.push_str(&format!(" F{}", (speed * 60.0).round() as i64));
            self.current_feed = Some(speed);
        }
        line.push_str(&format!(
            " X{:.3} Y{:.3}",
            to_millimeter(p.x),
            to_millimeter(p.y)
        ));
        if self.current_z != Some(z) {
            line.push_str(&format!(" Z{:.3}", to_millimeter(z)));
            self.current_z = Some(z);
        }
        if let Some(e) = e {
            line.push_str(&format!(" E{e:.5}"));
        }
        self.content.push_str(&line);
        self.content.push('\n');
        self.position = Some(at_height(p, z));
    }
}
