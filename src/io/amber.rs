//! Amber NetCDF trajectory and restart formats
//!
//! Both conventions share the same NetCDF-3 layout: a `spatial`
//! dimension of 3, an `atom` dimension, and `coordinates`,
//! `velocities`, `cell_lengths` and `cell_angles` variables. The
//! trajectory convention ("AMBER") stores many frames along a `frame`
//! record dimension; the restart convention ("AMBERRESTART") stores a
//! single frame without a record dimension.

use std::path::Path;

use crate::core::cell::{CellShape, UnitCell};
use crate::core::frame::Frame;
use crate::core::math::Vector3D;
use crate::errors::{Error, Result};
use crate::io::netcdf3::{DataType, Netcdf3Builder, Netcdf3File, Value, Variable, VariableDefinition};
use crate::io::registry::FormatMetadata;
use crate::io::trajectory::Mode;
use crate::io::Format;
use crate::warnings::warning;

/// Metadata for the Amber NetCDF trajectory format
pub fn trajectory_metadata() -> FormatMetadata {
    FormatMetadata {
        name: "Amber NetCDF",
        extension: Some(".nc"),
        description: "Amber convention for binary NetCDF molecular trajectories",
        read: true,
        write: true,
        memory: false,
        positions: true,
        velocities: true,
        unit_cell: true,
        atoms: false,
        bonds: false,
        residues: false,
    }
}

/// Build an Amber trajectory implementation for the file at `path`
pub fn trajectory_factory(path: &Path, mode: Mode) -> Result<Box<dyn Format>> {
    Ok(Box::new(AmberNetCDF::open(path, mode, Convention::Trajectory)?))
}

/// Metadata for the Amber NetCDF restart format
pub fn restart_metadata() -> FormatMetadata {
    FormatMetadata {
        name: "Amber Restart",
        extension: Some(".ncrst"),
        description: "Amber convention for binary NetCDF restart files",
        read: true,
        write: true,
        memory: false,
        positions: true,
        velocities: true,
        unit_cell: true,
        atoms: false,
        bonds: false,
        residues: false,
    }
}

/// Build an Amber restart implementation for the file at `path`
pub fn restart_factory(path: &Path, mode: Mode) -> Result<Box<dyn Format>> {
    Ok(Box::new(AmberNetCDF::open(path, mode, Convention::Restart)?))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Convention {
    Trajectory,
    Restart,
}

impl Convention {
    fn name(&self) -> &'static str {
        match self {
            Convention::Trajectory => "AMBER",
            Convention::Restart => "AMBERRESTART",
        }
    }
}

// a variable together with the unit scaling to apply on read
#[derive(Debug, Clone)]
struct ScaledVariable {
    variable: Variable,
    scale: f64,
}

#[derive(Debug)]
struct AmberNetCDF {
    file: Netcdf3File,
    convention: Convention,
    step: usize,
    writes: usize,
    natoms: usize,
    title: Option<String>,
    coordinates: Option<ScaledVariable>,
    velocities: Option<ScaledVariable>,
    cell_lengths: Option<ScaledVariable>,
    cell_angles: Option<ScaledVariable>,
}

impl AmberNetCDF {
    fn open(path: &Path, mode: Mode, convention: Convention) -> Result<AmberNetCDF> {
        let file = Netcdf3File::open(path, mode)?;
        let mut format = AmberNetCDF {
            file,
            convention,
            step: 0,
            writes: 0,
            natoms: 0,
            title: None,
            coordinates: None,
            velocities: None,
            cell_lengths: None,
            cell_angles: None,
        };

        if !format.file.initialized() {
            // the file will be initialized on the first write
            return Ok(format);
        }

        format.validate().map_err(|e| {
            Error::format(format!(
                "invalid Amber NetCDF file at '{}': {}",
                path.display(),
                e
            ))
        })?;
        format.load_variables()?;

        if convention == Convention::Trajectory && mode == Mode::Append {
            format.writes = format.file.n_records();
        }
        Ok(format)
    }

    fn validate(&self) -> Result<()> {
        let conventions = self
            .file
            .attribute("Conventions")
            .ok_or_else(|| Error::format("expected a 'Conventions' attribute to be defined"))?;
        if conventions.as_string()? != self.convention.name() {
            return Err(Error::format(format!(
                "expected '{}' convention",
                self.convention.name()
            )));
        }

        let version = self
            .file
            .attribute("ConventionVersion")
            .ok_or_else(|| Error::format("expected a 'ConventionVersion' attribute to be defined"))?;
        if version.as_string()? != "1.0" {
            return Err(Error::format(format!(
                "expected version 1.0 of the '{}' convention",
                self.convention.name()
            )));
        }

        let spatial = self
            .file
            .dimension("spatial")
            .ok_or_else(|| Error::format("missing 'spatial' dimension"))?;
        if spatial.size != 3 {
            return Err(Error::format(format!(
                "'spatial' dimension must have a size of 3, got {}",
                spatial.size
            )));
        }

        if self.file.dimension("atom").is_none() {
            return Err(Error::format("missing 'atom' dimension"));
        }

        for name in ["cell_spatial", "cell_angular"] {
            if let Some(dimension) = self.file.dimension(name) {
                if dimension.size != 3 {
                    return Err(Error::format(format!(
                        "'{}' dimension must have a size of 3, got {}",
                        name, dimension.size
                    )));
                }
            }
        }

        match self.convention {
            Convention::Trajectory => {
                let frame = self
                    .file
                    .dimension("frame")
                    .ok_or_else(|| Error::format("missing 'frame' dimension"))?;
                if !frame.is_record() {
                    return Err(Error::format(
                        "the 'frame' dimension must be the record dimension",
                    ));
                }
                self.validate_variable("coordinates", &["frame", "atom", "spatial"])?;
                self.validate_variable("velocities", &["frame", "atom", "spatial"])?;
                self.validate_variable("cell_lengths", &["frame", "cell_spatial"])?;
                self.validate_variable("cell_angles", &["frame", "cell_angular"])?;
            }
            Convention::Restart => {
                self.validate_variable("coordinates", &["atom", "spatial"])?;
                self.validate_variable("velocities", &["atom", "spatial"])?;
                self.validate_variable("cell_lengths", &["cell_spatial"])?;
                self.validate_variable("cell_angles", &["cell_angular"])?;
            }
        }

        Ok(())
    }

    // check the type and dimensions of a floating point variable, when
    // it is defined in the file
    fn validate_variable(&self, name: &str, expected: &[&str]) -> Result<()> {
        let Some(variable) = self.file.variable(name) else {
            return Ok(());
        };
        if variable.nc_type() != DataType::Float && variable.nc_type() != DataType::Double {
            return Err(Error::format(format!(
                "'{}' variable must contain floating point data",
                name
            )));
        }
        let dimensions = self.file.variable_dimensions(variable);
        if dimensions.len() != expected.len() {
            return Err(Error::format(format!(
                "'{}' variable must have {} dimensions, got {}",
                name,
                expected.len(),
                dimensions.len()
            )));
        }
        for (dimension, expected) in dimensions.iter().zip(expected) {
            if dimension.name != *expected {
                return Err(Error::format(format!(
                    "expected dimension '{}' for the '{}' variable, got '{}'",
                    expected, name, dimension.name
                )));
            }
        }
        Ok(())
    }

    fn load_variables(&mut self) -> Result<()> {
        self.natoms = self
            .file
            .dimension("atom")
            .map(|d| d.size)
            .unwrap_or(0);

        self.title = self
            .file
            .attribute("title")
            .and_then(|value| value.as_string().ok())
            .map(str::to_string);

        self.coordinates = self.scaled_variable("coordinates", scale_for_distance)?;
        if self.coordinates.is_none() {
            warning(
                "Amber NetCDF reader",
                "the coordinates variable is not defined in this file",
            );
        }
        self.velocities = self.scaled_variable("velocities", scale_for_velocity)?;
        self.cell_lengths = self.scaled_variable("cell_lengths", scale_for_distance)?;
        self.cell_angles = self.scaled_variable("cell_angles", scale_for_angle)?;

        if self.cell_lengths.is_some() && self.cell_angles.is_none() {
            return Err(Error::format(format!(
                "invalid Amber NetCDF file at '{}': cell_lengths requires cell_angles to be defined",
                self.file.path().display()
            )));
        }

        Ok(())
    }

    // look up a variable and fold its `scale_factor` and `units`
    // attributes into a single multiplier
    fn scaled_variable(
        &self,
        name: &str,
        scale_for_units: fn(&str) -> f64,
    ) -> Result<Option<ScaledVariable>> {
        let Some(variable) = self.file.variable(name) else {
            return Ok(None);
        };

        let mut scale = 1.0;
        if let Some(factor) = variable.attribute("scale_factor") {
            scale = factor.as_f64().map_err(|_| {
                Error::format(format!(
                    "scale_factor attribute for '{}' must be a floating point value",
                    name
                ))
            })?;
        }
        if let Some(Value::String(units)) = variable.attribute("units") {
            scale *= scale_for_units(units);
        }

        Ok(Some(ScaledVariable {
            variable: variable.clone(),
            scale,
        }))
    }

    fn record(&self) -> usize {
        match self.convention {
            Convention::Trajectory => self.step,
            Convention::Restart => 0,
        }
    }

    fn read_cell(&mut self) -> Result<UnitCell> {
        let (Some(lengths_var), Some(angles_var)) =
            (self.cell_lengths.clone(), self.cell_angles.clone())
        else {
            return Ok(UnitCell::infinite());
        };

        let record = self.record();
        let lengths = self.read_three(&lengths_var, record)?;
        let angles = self.read_three(&angles_var, record)?;
        if lengths == Vector3D::zeros() {
            return Ok(UnitCell::infinite());
        }
        Ok(UnitCell::triclinic(lengths, angles))
    }

    fn read_three(&mut self, variable: &ScaledVariable, record: usize) -> Result<Vector3D> {
        let mut result = Vector3D::zeros();
        match variable.variable.nc_type() {
            DataType::Double => {
                let mut data = Vec::new();
                self.file.read_f64(&variable.variable, record, &mut data)?;
                for k in 0..3 {
                    result[k] = variable.scale * data[k];
                }
            }
            _ => {
                let mut data = Vec::new();
                self.file.read_f32(&variable.variable, record, &mut data)?;
                for k in 0..3 {
                    result[k] = variable.scale * data[k] as f64;
                }
            }
        }
        Ok(result)
    }

    fn read_array(&mut self, variable: &ScaledVariable, array: &mut [Vector3D]) -> Result<()> {
        let record = self.record();
        match variable.variable.nc_type() {
            DataType::Double => {
                let mut data = Vec::new();
                self.file.read_f64(&variable.variable, record, &mut data)?;
                for (i, value) in array.iter_mut().enumerate() {
                    value[0] = variable.scale * data[3 * i];
                    value[1] = variable.scale * data[3 * i + 1];
                    value[2] = variable.scale * data[3 * i + 2];
                }
            }
            _ => {
                let mut data = Vec::new();
                self.file.read_f32(&variable.variable, record, &mut data)?;
                for (i, value) in array.iter_mut().enumerate() {
                    value[0] = variable.scale * data[3 * i] as f64;
                    value[1] = variable.scale * data[3 * i + 1] as f64;
                    value[2] = variable.scale * data[3 * i + 2] as f64;
                }
            }
        }
        Ok(())
    }

    fn write_three(&mut self, variable: &ScaledVariable, record: usize, values: Vector3D) -> Result<()> {
        match variable.variable.nc_type() {
            DataType::Double => {
                let data = [values[0], values[1], values[2]];
                self.file.write_f64(&variable.variable, record, &data)
            }
            _ => {
                let data = [values[0] as f32, values[1] as f32, values[2] as f32];
                self.file.write_f32(&variable.variable, record, &data)
            }
        }
    }

    fn write_array(&mut self, variable: &ScaledVariable, record: usize, array: &[Vector3D]) -> Result<()> {
        match variable.variable.nc_type() {
            DataType::Double => {
                let mut data = vec![0.0f64; array.len() * 3];
                for (i, value) in array.iter().enumerate() {
                    data[3 * i] = value[0];
                    data[3 * i + 1] = value[1];
                    data[3 * i + 2] = value[2];
                }
                self.file.write_f64(&variable.variable, record, &data)
            }
            _ => {
                let mut data = vec![0.0f32; array.len() * 3];
                for (i, value) in array.iter().enumerate() {
                    data[3 * i] = value[0] as f32;
                    data[3 * i + 1] = value[1] as f32;
                    data[3 * i + 2] = value[2] as f32;
                }
                self.file.write_f32(&variable.variable, record, &data)
            }
        }
    }

    fn initialize(&mut self, frame: &Frame) -> Result<()> {
        let mut builder = Netcdf3Builder::new();
        builder.add_attribute("Conventions", self.convention.name());
        builder.add_attribute("ConventionVersion", "1.0");
        builder.add_attribute("program", "molio");
        builder.add_attribute("programVersion", crate::VERSION);
        if let Some(title) = frame.get("name").and_then(|p| p.as_string().ok()) {
            if !title.is_empty() {
                builder.add_attribute("title", title);
            }
        }

        let spatial = builder.add_dimension("spatial", 3);
        let atom = builder.add_dimension("atom", frame.size());
        let cell_spatial = builder.add_dimension("cell_spatial", 3);
        let cell_angular = builder.add_dimension("cell_angular", 3);
        let label = builder.add_dimension("label", 5);

        builder.add_variable(
            "spatial",
            VariableDefinition {
                nc_type: DataType::Char,
                dimensions: vec![spatial],
                attributes: vec![],
            },
        )?;
        builder.add_variable(
            "cell_spatial",
            VariableDefinition {
                nc_type: DataType::Char,
                dimensions: vec![cell_spatial],
                attributes: vec![],
            },
        )?;
        builder.add_variable(
            "cell_angular",
            VariableDefinition {
                nc_type: DataType::Char,
                dimensions: vec![cell_angular, label],
                attributes: vec![],
            },
        )?;

        // the trajectory convention uses single precision records, the
        // restart convention stores one double precision frame
        let (nc_type, atom_dims, cell_length_dims, cell_angle_dims) = match self.convention {
            Convention::Trajectory => {
                let frame_dim = builder.add_dimension("frame", 0);
                (
                    DataType::Float,
                    vec![frame_dim, atom, spatial],
                    vec![frame_dim, cell_spatial],
                    vec![frame_dim, cell_angular],
                )
            }
            Convention::Restart => (
                DataType::Double,
                vec![atom, spatial],
                vec![cell_spatial],
                vec![cell_angular],
            ),
        };

        builder.add_variable(
            "coordinates",
            VariableDefinition {
                nc_type,
                dimensions: atom_dims.clone(),
                attributes: vec![("units".into(), "angstrom".into())],
            },
        )?;
        builder.add_variable(
            "cell_lengths",
            VariableDefinition {
                nc_type,
                dimensions: cell_length_dims,
                attributes: vec![("units".into(), "angstrom".into())],
            },
        )?;
        builder.add_variable(
            "cell_angles",
            VariableDefinition {
                nc_type,
                dimensions: cell_angle_dims,
                attributes: vec![("units".into(), "degree".into())],
            },
        )?;
        if frame.velocities().is_some() {
            builder.add_variable(
                "velocities",
                VariableDefinition {
                    nc_type,
                    dimensions: atom_dims,
                    attributes: vec![("units".into(), "angstrom/picosecond".into())],
                },
            )?;
        }

        builder.initialize(&mut self.file)?;

        // label variables are written once
        let spatial = self.file.variable("spatial").map(Clone::clone);
        if let Some(variable) = spatial {
            self.file.write_chars(&variable, 0, "xyz")?;
        }
        let cell_spatial = self.file.variable("cell_spatial").map(Clone::clone);
        if let Some(variable) = cell_spatial {
            self.file.write_chars(&variable, 0, "abc")?;
        }
        let cell_angular = self.file.variable("cell_angular").map(Clone::clone);
        if let Some(variable) = cell_angular {
            self.file.write_chars(&variable, 0, "alphabeta gamma")?;
        }

        self.natoms = frame.size();
        self.load_variables()?;
        Ok(())
    }
}

impl Format for AmberNetCDF {
    fn nsteps(&mut self) -> usize {
        match self.convention {
            Convention::Trajectory => self.file.n_records(),
            Convention::Restart => {
                if self.file.initialized() {
                    1
                } else {
                    0
                }
            }
        }
    }

    fn read(&mut self, frame: &mut Frame) -> Result<()> {
        let step = self.step;
        self.read_step(step, frame)
    }

    fn read_step(&mut self, step: usize, frame: &mut Frame) -> Result<()> {
        self.step = step;

        let cell = self.read_cell()?;
        frame.set_cell(cell);

        if let Some(title) = &self.title {
            frame.set("name", title.clone());
        }

        frame.resize(self.natoms)?;

        if let Some(coordinates) = self.coordinates.clone() {
            let mut data = vec![Vector3D::zeros(); self.natoms];
            self.read_array(&coordinates, &mut data)?;
            frame.positions_mut().copy_from_slice(&data);
        }

        if let Some(velocities) = self.velocities.clone() {
            frame.add_velocities();
            let mut data = vec![Vector3D::zeros(); self.natoms];
            self.read_array(&velocities, &mut data)?;
            if let Some(target) = frame.velocities_mut() {
                target.copy_from_slice(&data);
            }
        }

        self.step = step + 1;
        Ok(())
    }

    fn write(&mut self, frame: &Frame) -> Result<()> {
        if self.convention == Convention::Restart && self.writes != 0 {
            return Err(Error::format(
                "AMBER Restart format only supports writing one frame",
            ));
        }

        if !self.file.initialized() {
            self.initialize(frame)?;
        }

        if frame.size() != self.natoms {
            return Err(Error::format(format!(
                "this file can only write frames with {} atoms, but the frame contains {} atoms",
                self.natoms,
                frame.size()
            )));
        }

        let record = match self.convention {
            Convention::Trajectory => {
                self.file.add_record()?;
                self.file.n_records() - 1
            }
            Convention::Restart => 0,
        };

        // cell data
        if let (Some(lengths), Some(angles)) = (self.cell_lengths.clone(), self.cell_angles.clone())
        {
            let cell = frame.cell();
            self.write_three(&lengths, record, cell.lengths())?;
            self.write_three(&angles, record, cell.angles())?;
        } else if frame.cell().shape() != CellShape::Infinite {
            warning(
                "Amber NetCDF",
                "this file does not contain space for unit cell data, it will not be saved",
            );
        }

        if let Some(coordinates) = self.coordinates.clone() {
            self.write_array(&coordinates, record, frame.positions())?;
        }

        if let Some(data) = frame.velocities() {
            if let Some(velocities) = self.velocities.clone() {
                let data = data.to_vec();
                self.write_array(&velocities, record, &data)?;
            } else {
                warning(
                    "Amber NetCDF",
                    "this file does not contain space for velocities, they will not be saved",
                );
            }
        }

        self.writes += 1;
        Ok(())
    }
}

fn scale_for_distance(units: &str) -> f64 {
    match units.to_lowercase().as_str() {
        "" | "angstroms" | "angstrom" | "a" => 1.0,
        "meters" | "meter" | "m" => 1e10,
        "centimeters" | "centimeter" | "cm" => 1e8,
        "micrometers" | "micrometer" | "µm" | "um" => 1e4,
        "nanometers" | "nanometer" | "nm" => 10.0,
        "picometers" | "picometer" | "pm" => 1e-2,
        "bohrs" | "bohr" => 0.52918,
        other => {
            warning(
                "Amber NetCDF reader",
                format!("unknown unit ({}) for distances", other),
            );
            1.0
        }
    }
}

fn scale_for_angle(units: &str) -> f64 {
    match units.to_lowercase().as_str() {
        "" | "degrees" | "degree" => 1.0,
        "radians" | "radian" => 180.0 / std::f64::consts::PI,
        other => {
            warning(
                "Amber NetCDF reader",
                format!("unknown unit ({}) for angles", other),
            );
            1.0
        }
    }
}

fn scale_for_velocity(units: &str) -> f64 {
    let units = units.to_lowercase();
    let mut parts = units.split('/');
    let (Some(distance), Some(time), None) = (parts.next(), parts.next(), parts.next()) else {
        warning(
            "Amber NetCDF reader",
            format!("unknown unit ({}) for velocities", units),
        );
        return 1.0;
    };

    let mut scale = scale_for_distance(distance);
    match time {
        "picoseconds" | "picosecond" | "ps" => {}
        "femtoseconds" | "femtosecond" | "fs" => scale *= 1e3,
        "nanoseconds" | "nanosecond" | "ns" => scale *= 1e-3,
        "microseconds" | "microsecond" | "µs" | "us" => scale *= 1e-6,
        "seconds" | "second" | "s" => scale *= 1e-12,
        other => {
            warning(
                "Amber NetCDF reader",
                format!("unknown unit ({}) for time", other),
            );
        }
    }
    scale
}
