//! LAMMPS dump ("trajectory") file format
//!
//! Dump files are sequences of `ITEM:` delimited records. The per-atom
//! columns are declared in the `ITEM: ATOMS` header, and positions can
//! be present in up to four representations (wrapped, scaled, unwrapped,
//! scaled-unwrapped) with optional image flags. The reader picks the
//! best declared representation and converts it to plain cartesian
//! coordinates.

use std::collections::HashMap;
use std::path::Path;

use crate::core::cell::{CellShape, UnitCell};
use crate::core::frame::Frame;
use crate::core::math::{Matrix3D, Vector3D};
use crate::errors::{Error, Result};
use crate::io::registry::FormatMetadata;
use crate::io::text::{parse, print_file, TextFile, TextFormat, TextFormatImpl};
use crate::io::trajectory::Mode;
use crate::io::Format;
use crate::warnings::warning;

/// Metadata for the LAMMPS trajectory format
pub fn metadata() -> FormatMetadata {
    FormatMetadata {
        name: "LAMMPS",
        extension: Some(".lammpstrj"),
        description: "LAMMPS text trajectory format",
        read: true,
        write: true,
        memory: true,
        positions: true,
        velocities: true,
        unit_cell: true,
        atoms: true,
        bonds: false,
        residues: false,
    }
}

/// Build a LAMMPS format implementation for the file at `path`
pub fn factory(path: &Path, mode: Mode) -> Result<Box<dyn Format>> {
    Ok(Box::new(TextFormat::new(path, mode, LammpsFormat::new())?))
}

// per-atom attributes a dump command can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AtomAttribute {
    Custom,
    AtomId,
    Type,
    Element,
    Mass,
    // unscaled coordinates
    PosX,
    PosY,
    PosZ,
    // scaled coordinates
    PosXS,
    PosYS,
    PosZS,
    // unwrapped coordinates
    PosXU,
    PosYU,
    PosZU,
    // scaled unwrapped coordinates
    PosXSU,
    PosYSU,
    PosZSU,
    // box image the atom is in
    ImgX,
    ImgY,
    ImgZ,
    VelX,
    VelY,
    VelZ,
    Charge,
}

impl AtomAttribute {
    fn from_str(attribute: &str) -> AtomAttribute {
        use AtomAttribute::*;
        match attribute {
            "id" => AtomId,
            "type" => Type,
            "element" => Element,
            "mass" => Mass,
            "x" => PosX,
            "y" => PosY,
            "z" => PosZ,
            "xs" => PosXS,
            "ys" => PosYS,
            "zs" => PosZS,
            "xu" => PosXU,
            "yu" => PosYU,
            "zu" => PosZU,
            "xsu" => PosXSU,
            "ysu" => PosYSU,
            "zsu" => PosZSU,
            "ix" => ImgX,
            "iy" => ImgY,
            "iz" => ImgZ,
            "vx" => VelX,
            "vy" => VelY,
            "vz" => VelZ,
            "q" => Charge,
            _ => Custom,
        }
    }
}

// the representations atomic positions can be stored in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PositionRepresentation {
    None,
    Wrapped,
    Scaled,
    Unwrapped,
    ScaledUnwrapped,
}

struct AtomField {
    name: String,
    kind: AtomAttribute,
}

// choose the coordinate style that is declared for the most dimensions,
// preferring unwrapped over wrapped, and non-scaled over scaled
fn best_position_representation(fields: &[AtomField]) -> PositionRepresentation {
    use AtomAttribute::*;
    let mut wrapped = 0;
    let mut scaled = 0;
    let mut unwrapped = 0;
    let mut scaled_unwrapped = 0;
    for field in fields {
        match field.kind {
            PosX | PosY | PosZ => wrapped += 1,
            PosXS | PosYS | PosZS => scaled += 1,
            PosXU | PosYU | PosZU => unwrapped += 1,
            PosXSU | PosYSU | PosZSU => scaled_unwrapped += 1,
            _ => {}
        }
    }

    if wrapped == 0 && scaled == 0 && unwrapped == 0 && scaled_unwrapped == 0 {
        PositionRepresentation::None
    } else if unwrapped >= scaled_unwrapped && unwrapped >= wrapped && unwrapped >= scaled {
        PositionRepresentation::Unwrapped
    } else if scaled_unwrapped >= wrapped && scaled_unwrapped >= scaled {
        PositionRepresentation::ScaledUnwrapped
    } else if wrapped >= scaled {
        PositionRepresentation::Wrapped
    } else {
        PositionRepresentation::Scaled
    }
}

// unwrap a position using the image flags and the cell matrix
fn unwrap_position(position: &mut Vector3D, image: &[i64; 3], matrix: &Matrix3D) {
    let image = Vector3D::new(image[0] as f64, image[1] as f64, image[2] as f64);
    *position += matrix * image;
}

// the "ITEM: <name>" payload of a header line, if it is one
fn get_item(line: &str) -> Option<&str> {
    let mut parts = line.splitn(2, ':');
    if parts.next().map(str::trim) != Some("ITEM") {
        return None;
    }
    parts.next().map(str::trim)
}

struct LammpsFormat {
    // numeric types generated for non-numeric atom types on write
    type_list: HashMap<String, usize>,
    min_numeric_type: usize,
    max_numeric_type: usize,
}

impl LammpsFormat {
    fn new() -> LammpsFormat {
        LammpsFormat {
            type_list: HashMap::new(),
            min_numeric_type: 0,
            max_numeric_type: 0,
        }
    }

    // read the "ITEM: BOX BOUNDS" record, set the frame cell and return
    // the box origin
    fn read_cell(&mut self, file: &mut TextFile, frame: &mut Frame) -> Result<[f64; 3]> {
        let line = file.readline()?;
        let item = get_item(&line)
            .ok_or_else(|| Error::format(format!("expected an ITEM entry in LAMMPS format, got '{}'", line)))?;

        let mut fields = item.split_whitespace();
        if fields.next() != Some("BOX") || fields.next() != Some("BOUNDS") {
            return Err(Error::format("missing 'BOX BOUNDS' item in LAMMPS format"));
        }
        let triclinic = item.contains("xy xz yz");

        let mut matrix = Matrix3D::zeros();
        let mut origin = [0.0; 3];
        // (lo, hi) per axis, with the tilt factors xy, xz, yz on the
        // successive lines of a triclinic box
        let tilt_slots: [(usize, usize); 3] = [(0, 1), (0, 2), (1, 2)];
        for (axis, &(tilt_row, tilt_col)) in tilt_slots.iter().enumerate() {
            let line = file.readline()?;
            let fields: Vec<&str> = line.split_whitespace().collect();
            let expected = if triclinic { 3 } else { 2 };
            if fields.len() != expected {
                return Err(Error::format(format!(
                    "incomplete box dimensions in LAMMPS format, expected {} but got {}",
                    expected,
                    fields.len()
                )));
            }
            let lo: f64 = parse(fields[0])?;
            let hi: f64 = parse(fields[1])?;
            matrix[(axis, axis)] = hi - lo;
            origin[axis] = lo;
            if triclinic {
                matrix[(tilt_row, tilt_col)] = parse(fields[2])?;
            }
        }

        frame.set_cell(UnitCell::from_matrix(matrix));
        Ok(origin)
    }
}

impl TextFormatImpl for LammpsFormat {
    fn name(&self) -> &'static str {
        "LAMMPS"
    }

    fn forward(&mut self, file: &mut TextFile) -> Result<Option<u64>> {
        let position = file.tellpos()?;

        let mut line = file.readline()?;
        if line.trim().is_empty() || file.eof() {
            return Ok(None);
        }
        let mut item = get_item(&line).map(str::to_string);
        while !file.eof() && item.as_deref() != Some("NUMBER OF ATOMS") {
            line = file.readline()?;
            item = get_item(&line).map(str::to_string);
        }
        if item.as_deref() != Some("NUMBER OF ATOMS") {
            return Err(Error::format(
                "could not find 'ITEM: NUMBER OF ATOMS' in LAMMPS trajectory",
            ));
        }

        let line = file.readline()?;
        let natoms: usize = parse(&line).map_err(|_| {
            Error::format(format!(
                "could not parse the number of atoms in '{}' for LAMMPS trajectory",
                line
            ))
        })?;

        // the box: the BOX BOUNDS header and three lines of bounds
        for i in 0..4 {
            let line = file.readline()?;
            if file.eof() {
                return Err(Error::format(
                    "could not read box data in LAMMPS trajectory: not enough lines in the file",
                ));
            }
            if i == 0 {
                let ok = get_item(&line).is_some_and(|item| item.starts_with("BOX BOUNDS"));
                if !ok {
                    return Err(Error::format(format!(
                        "expected 'ITEM: BOX BOUNDS' after the number of atoms in \
                         LAMMPS trajectory, got '{}'",
                        line
                    )));
                }
            }
        }

        let line = file.readline()?;
        let ok = get_item(&line).is_some_and(|item| item.starts_with("ATOMS"));
        if !ok {
            return Err(Error::format(format!(
                "could not read atom header for LAMMPS trajectory in this line: '{}'",
                line
            )));
        }

        for _ in 0..natoms {
            file.readline()?;
            if file.eof() {
                return Err(Error::format(
                    "this file does not contain enough lines in ATOMS section for LAMMPS trajectory",
                ));
            }
        }

        Ok(Some(position))
    }

    fn read_next(&mut self, file: &mut TextFile, frame: &mut Frame) -> Result<()> {
        let mut line = file.readline()?;
        let mut item = get_item(&line)
            .ok_or_else(|| Error::format("can not read next step as LAMMPS format: expected an ITEM entry"))?
            .to_string();

        if item == "UNITS" {
            // optional
            frame.set("lammps_units", file.readline()?.trim());
            line = file.readline()?;
            item = get_item(&line)
                .ok_or_else(|| Error::format("can not read next step as LAMMPS format: expected an ITEM entry"))?
                .to_string();
        }
        if item == "TIME" {
            // optional
            let time: f64 = parse(&file.readline()?)?;
            frame.set("time", time);
            line = file.readline()?;
            item = get_item(&line)
                .ok_or_else(|| Error::format("can not read next step as LAMMPS format: expected an ITEM entry"))?
                .to_string();
        }

        if item == "TIMESTEP" {
            let timestep: u64 = parse(&file.readline()?)?;
            frame.set_step(timestep);
        } else {
            return Err(Error::format(format!(
                "can not read next step as LAMMPS format: expected 'TIMESTEP' got '{}'",
                item
            )));
        }

        let line = file.readline()?;
        let natoms = match get_item(&line) {
            Some("NUMBER OF ATOMS") => parse::<usize>(&file.readline()?)?,
            _ => {
                return Err(Error::format(format!(
                    "can not read next step as LAMMPS format: expected 'NUMBER OF ATOMS' got '{}'",
                    line
                )));
            }
        };

        // LAMMPS boxes do not have to use (0, 0, 0) as origin
        let origin = self.read_cell(file, frame)?;

        let line = file.readline()?;
        let item = get_item(&line)
            .ok_or_else(|| Error::format("can not read next step as LAMMPS format: expected an ITEM entry"))?;
        let mut header = item.split_whitespace();
        if header.next() != Some("ATOMS") {
            return Err(Error::format(format!(
                "can not read next step as LAMMPS format: expected 'ATOMS' got '{}'",
                item
            )));
        }

        let mut fields = Vec::new();
        let mut atomid_column = None;
        let mut images: Option<Vec<[i64; 3]>> = None;
        for (column, name) in header.enumerate() {
            let kind = AtomAttribute::from_str(name);
            if kind == AtomAttribute::AtomId {
                atomid_column = Some(column);
            }
            if matches!(kind, AtomAttribute::VelX | AtomAttribute::VelY | AtomAttribute::VelZ) {
                frame.add_velocities();
            }
            if matches!(kind, AtomAttribute::ImgX | AtomAttribute::ImgY | AtomAttribute::ImgZ) {
                images = Some(vec![[0; 3]; natoms]);
            }
            fields.push(AtomField {
                name: name.to_string(),
                kind,
            });
        }
        let representation = best_position_representation(&fields);

        frame.resize(natoms)?;
        let mut duplicate_check = vec![false; natoms];

        for i in 0..natoms {
            let line = file.readline()?;
            let values: Vec<&str> = line.split_whitespace().collect();
            if values.len() != fields.len() {
                return Err(Error::format(format!(
                    "LAMMPS atom line has wrong number of fields: expected {} got {}",
                    fields.len(),
                    values.len()
                )));
            }

            let mut atomid = i;
            if let Some(column) = atomid_column {
                // LAMMPS atom IDs start at 1
                let id: usize = parse(values[column])?;
                if id == 0 || id > natoms {
                    return Err(Error::format(format!(
                        "invalid atom ID {} in LAMMPS format: expected a value between 1 and {}",
                        id, natoms
                    )));
                }
                atomid = id - 1;
                if duplicate_check[atomid] {
                    return Err(Error::format(format!(
                        "found atoms with the same ID in LAMMPS format: {} is already present",
                        id
                    )));
                }
                duplicate_check[atomid] = true;
            }

            use AtomAttribute::*;
            for (value, field) in values.iter().zip(&fields) {
                match field.kind {
                    Type => {
                        if let Some(atom) = frame.topology_mut().atom_mut(atomid) {
                            atom.set_type(*value);
                        }
                    }
                    Element => {
                        if let Some(atom) = frame.topology_mut().atom_mut(atomid) {
                            atom.set_name(*value);
                        }
                    }
                    Mass => {
                        let mass: f64 = parse(value)?;
                        if let Some(atom) = frame.topology_mut().atom_mut(atomid) {
                            atom.set_mass(mass);
                        }
                    }
                    Charge => {
                        let charge: f64 = parse(value)?;
                        if let Some(atom) = frame.topology_mut().atom_mut(atomid) {
                            atom.set_charge(charge);
                        }
                    }
                    PosX if representation == PositionRepresentation::Wrapped => {
                        frame.positions_mut()[atomid][0] = parse(value)?;
                    }
                    PosY if representation == PositionRepresentation::Wrapped => {
                        frame.positions_mut()[atomid][1] = parse(value)?;
                    }
                    PosZ if representation == PositionRepresentation::Wrapped => {
                        frame.positions_mut()[atomid][2] = parse(value)?;
                    }
                    // scaled positions are stored as-is and transformed
                    // once all three coordinates are known
                    PosXS if representation == PositionRepresentation::Scaled => {
                        frame.positions_mut()[atomid][0] = parse(value)?;
                    }
                    PosYS if representation == PositionRepresentation::Scaled => {
                        frame.positions_mut()[atomid][1] = parse(value)?;
                    }
                    PosZS if representation == PositionRepresentation::Scaled => {
                        frame.positions_mut()[atomid][2] = parse(value)?;
                    }
                    PosXU if representation == PositionRepresentation::Unwrapped => {
                        frame.positions_mut()[atomid][0] = parse(value)?;
                    }
                    PosYU if representation == PositionRepresentation::Unwrapped => {
                        frame.positions_mut()[atomid][1] = parse(value)?;
                    }
                    PosZU if representation == PositionRepresentation::Unwrapped => {
                        frame.positions_mut()[atomid][2] = parse(value)?;
                    }
                    PosXSU if representation == PositionRepresentation::ScaledUnwrapped => {
                        frame.positions_mut()[atomid][0] = parse(value)?;
                    }
                    PosYSU if representation == PositionRepresentation::ScaledUnwrapped => {
                        frame.positions_mut()[atomid][1] = parse(value)?;
                    }
                    PosZSU if representation == PositionRepresentation::ScaledUnwrapped => {
                        frame.positions_mut()[atomid][2] = parse(value)?;
                    }
                    ImgX => {
                        if let Some(images) = &mut images {
                            images[atomid][0] = parse(value)?;
                        }
                    }
                    ImgY => {
                        if let Some(images) = &mut images {
                            images[atomid][1] = parse(value)?;
                        }
                    }
                    ImgZ => {
                        if let Some(images) = &mut images {
                            images[atomid][2] = parse(value)?;
                        }
                    }
                    VelX => {
                        let v: f64 = parse(value)?;
                        if let Some(velocities) = frame.velocities_mut() {
                            velocities[atomid][0] = v;
                        }
                    }
                    VelY => {
                        let v: f64 = parse(value)?;
                        if let Some(velocities) = frame.velocities_mut() {
                            velocities[atomid][1] = v;
                        }
                    }
                    VelZ => {
                        let v: f64 = parse(value)?;
                        if let Some(velocities) = frame.velocities_mut() {
                            velocities[atomid][2] = v;
                        }
                    }
                    AtomId => {}
                    Custom => {
                        // LAMMPS should always write double values, with
                        // the raw string as fallback
                        if let Some(atom) = frame.topology_mut().atom_mut(atomid) {
                            match parse::<f64>(value) {
                                Ok(number) => atom.set(field.name.clone(), number),
                                Err(_) => atom.set(field.name.clone(), *value),
                            }
                        }
                    }
                    _ => {}
                }
            }
        }

        let matrix = *frame.cell().matrix();
        if representation == PositionRepresentation::Scaled
            || representation == PositionRepresentation::ScaledUnwrapped
        {
            // transform the scaled coordinates to cartesian:
            // x = xlo + xs * (xhi - xlo) + ys * xy + zs * xz
            for i in 0..natoms {
                let scaled = frame.positions()[i];
                let cartesian = matrix * scaled;
                frame.positions_mut()[i] = Vector3D::new(
                    origin[0] + cartesian[0],
                    origin[1] + cartesian[1],
                    origin[2] + cartesian[2],
                );
                if representation != PositionRepresentation::ScaledUnwrapped {
                    if let Some(images) = &images {
                        unwrap_position(&mut frame.positions_mut()[i], &images[i], &matrix);
                    }
                }
            }
        } else if representation != PositionRepresentation::Unwrapped {
            if let Some(images) = &images {
                for i in 0..natoms {
                    unwrap_position(&mut frame.positions_mut()[i], &images[i], &matrix);
                }
            }
        }

        let unwrapped = representation == PositionRepresentation::Unwrapped
            || representation == PositionRepresentation::ScaledUnwrapped
            || images.is_some();
        frame.set("is_unwrapped", unwrapped);

        Ok(())
    }

    fn write_next(&mut self, file: &mut TextFile, frame: &Frame) -> Result<()> {
        let units = frame
            .get("lammps_units")
            .and_then(|p| p.as_string().ok())
            .unwrap_or("real");
        print_file!(file, "ITEM: UNITS\n{}\n", units)?;
        if let Some(time) = frame.get("time").and_then(|p| p.as_double().ok()) {
            print_file!(file, "ITEM: TIME\n{:.16}\n", time)?;
        }
        print_file!(file, "ITEM: TIMESTEP\n{}\n", frame.step())?;
        print_file!(file, "ITEM: NUMBER OF ATOMS\n{}\n", frame.size())?;

        let cell = frame.cell();
        match cell.shape() {
            CellShape::Orthorhombic | CellShape::Infinite => {
                // zeros are printed for an infinite cell, the box lines
                // are still required
                let lengths = cell.lengths();
                print_file!(file, "ITEM: BOX BOUNDS pp pp pp\n")?;
                for axis in 0..3 {
                    print_file!(file, "{:-1.12e} {:-1.12e}\n", 0.0, lengths[axis])?;
                }
            }
            CellShape::Triclinic => {
                let matrix = cell.matrix();
                if !crate::core::math::is_upper_triangular(matrix) {
                    return Err(Error::format(
                        "unsupported triclinic but non upper-triangular cell matrix in LAMMPS writer",
                    ));
                }
                print_file!(file, "ITEM: BOX BOUNDS xy xz yz pp pp pp\n")?;
                print_file!(file, "{:-1.12e} {:-1.12e} {:-1.12e}\n", 0.0, matrix[(0, 0)], matrix[(0, 1)])?;
                print_file!(file, "{:-1.12e} {:-1.12e} {:-1.12e}\n", 0.0, matrix[(1, 1)], matrix[(0, 2)])?;
                print_file!(file, "{:-1.12e} {:-1.12e} {:-1.12e}\n", 0.0, matrix[(2, 2)], matrix[(1, 2)])?;
            }
        }

        let has_names = frame.topology().atoms().iter().any(|atom| !atom.name().is_empty());

        print_file!(file, "ITEM: ATOMS id xu yu zu type")?;
        if has_names {
            print_file!(file, " element")?;
        }
        print_file!(file, " mass q")?;
        if frame.velocities().is_some() {
            print_file!(file, " vx vy vz")?;
        }
        print_file!(file, "\n")?;

        let positions = frame.positions();
        for (i, atom) in frame.topology().atoms().iter().enumerate() {
            // LAMMPS atom IDs start at 1
            print_file!(
                file,
                "{} {} {} {}",
                i + 1,
                positions[i][0],
                positions[i][1],
                positions[i][2]
            )?;

            let numeric_type = atom.atom_type().parse::<usize>().ok().filter(|&t| t > 0);
            match numeric_type {
                Some(t) if self.min_numeric_type == 0 || t <= self.min_numeric_type => {
                    // a valid numeric type, and no invalid types were
                    // encountered before
                    print_file!(file, " {}", t)?;
                    self.max_numeric_type = self.max_numeric_type.max(t);
                }
                _ => {
                    // generate a numeric type for this atom type
                    match self.type_list.get(atom.atom_type()) {
                        Some(t) => print_file!(file, " {}", t)?,
                        None => {
                            self.min_numeric_type = self.max_numeric_type;
                            self.max_numeric_type += 1;
                            self.type_list
                                .insert(atom.atom_type().to_string(), self.max_numeric_type);
                            print_file!(file, " {}", self.max_numeric_type)?;
                            warning(
                                "LAMMPS writer",
                                format!(
                                    "trajectory with invalid types: generated type for '{}' is {}",
                                    atom.atom_type(),
                                    self.max_numeric_type
                                ),
                            );
                        }
                    }
                }
            }

            if has_names {
                print_file!(file, " {}", atom.name())?;
            }
            print_file!(file, " {} {}", atom.mass(), atom.charge())?;
            if let Some(velocities) = frame.velocities() {
                let v = velocities[i];
                print_file!(file, " {} {} {}", v[0], v[1], v[2])?;
            }
            print_file!(file, "\n")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::atom::Atom;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("molio-lammps-{}-{}", std::process::id(), name))
    }

    const SIMPLE_DUMP: &str = "\
ITEM: TIMESTEP
100
ITEM: NUMBER OF ATOMS
2
ITEM: BOX BOUNDS pp pp pp
0.0 10.0
0.0 10.0
0.0 10.0
ITEM: ATOMS id type x y z q
2 1 5.0 6.0 7.0 -0.5
1 2 1.0 2.0 3.0 0.5
";

    #[test]
    fn test_read_out_of_order_atoms() {
        let path = temp_path("simple.lammpstrj");
        std::fs::write(&path, SIMPLE_DUMP).unwrap();

        let mut format = factory(&path, Mode::Read).unwrap();
        assert_eq!(format.nsteps(), 1);

        let mut frame = Frame::new();
        format.read(&mut frame).unwrap();
        assert_eq!(frame.step(), 100);
        assert_eq!(frame.size(), 2);
        // the id column places the atoms, whatever the line order
        assert_eq!(frame.positions()[0], Vector3D::new(1.0, 2.0, 3.0));
        assert_eq!(frame.positions()[1], Vector3D::new(5.0, 6.0, 7.0));
        assert_eq!(frame.topology().atoms()[0].atom_type(), "2");
        assert_eq!(frame.topology().atoms()[0].charge(), 0.5);
        assert_eq!(frame.cell().lengths(), Vector3D::new(10.0, 10.0, 10.0));
        assert_eq!(frame.get("is_unwrapped").unwrap().as_bool().unwrap(), false);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_duplicate_atom_id() {
        let dump = SIMPLE_DUMP.replace("2 1 5.0 6.0 7.0 -0.5", "1 1 5.0 6.0 7.0 -0.5");
        let path = temp_path("duplicate.lammpstrj");
        std::fs::write(&path, dump).unwrap();

        let mut format = factory(&path, Mode::Read).unwrap();
        let mut frame = Frame::new();
        let error = format.read(&mut frame).unwrap_err();
        assert!(error.to_string().contains("same ID"));

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_scaled_positions() {
        let dump = "\
ITEM: TIMESTEP
0
ITEM: NUMBER OF ATOMS
1
ITEM: BOX BOUNDS pp pp pp
-2.0 8.0
0.0 20.0
0.0 10.0
ITEM: ATOMS id xs ys zs
1 0.5 0.25 0.1
";
        let path = temp_path("scaled.lammpstrj");
        std::fs::write(&path, dump).unwrap();

        let mut format = factory(&path, Mode::Read).unwrap();
        let mut frame = Frame::new();
        format.read(&mut frame).unwrap();
        // x = -2 + 0.5 * 10, y = 0.25 * 20, z = 0.1 * 10
        assert!((frame.positions()[0] - Vector3D::new(3.0, 5.0, 1.0)).norm() < 1e-12);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_image_unwrapping() {
        let dump = "\
ITEM: TIMESTEP
0
ITEM: NUMBER OF ATOMS
1
ITEM: BOX BOUNDS pp pp pp
0.0 10.0
0.0 10.0
0.0 10.0
ITEM: ATOMS id x y z ix iy iz
1 1.0 2.0 3.0 1 0 -1
";
        let path = temp_path("images.lammpstrj");
        std::fs::write(&path, dump).unwrap();

        let mut format = factory(&path, Mode::Read).unwrap();
        let mut frame = Frame::new();
        format.read(&mut frame).unwrap();
        assert!((frame.positions()[0] - Vector3D::new(11.0, 2.0, -7.0)).norm() < 1e-12);
        assert_eq!(frame.get("is_unwrapped").unwrap().as_bool().unwrap(), true);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_representation_selection() {
        // unwrapped coordinates win over wrapped ones
        let dump = "\
ITEM: TIMESTEP
0
ITEM: NUMBER OF ATOMS
1
ITEM: BOX BOUNDS pp pp pp
0.0 10.0
0.0 10.0
0.0 10.0
ITEM: ATOMS id x y z xu yu zu
1 1.0 2.0 3.0 11.0 2.0 3.0
";
        let path = temp_path("representation.lammpstrj");
        std::fs::write(&path, dump).unwrap();

        let mut format = factory(&path, Mode::Read).unwrap();
        let mut frame = Frame::new();
        format.read(&mut frame).unwrap();
        assert!((frame.positions()[0] - Vector3D::new(11.0, 2.0, 3.0)).norm() < 1e-12);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_roundtrip() {
        let path = temp_path("roundtrip.lammpstrj");
        {
            let mut format = factory(&path, Mode::Write).unwrap();
            let mut frame = Frame::with_cell(UnitCell::orthorhombic(15.0, 15.0, 15.0));
            frame.set_step(42);
            frame.add_velocities();
            let mut atom = Atom::with_type("O", "1");
            atom.set_charge(-0.8);
            frame.add_atom(atom, Vector3D::new(1.0, 2.0, 3.0), Some(Vector3D::new(0.1, 0.0, 0.0)));
            let mut atom = Atom::with_type("H", "2");
            atom.set_charge(0.4);
            frame.add_atom(atom, Vector3D::new(1.5, 2.5, 3.5), None);
            format.write(&frame).unwrap();
        }

        let mut format = factory(&path, Mode::Read).unwrap();
        assert_eq!(format.nsteps(), 1);
        let mut frame = Frame::new();
        format.read(&mut frame).unwrap();
        assert_eq!(frame.step(), 42);
        assert_eq!(frame.size(), 2);
        assert_eq!(frame.topology().atoms()[0].name(), "O");
        assert_eq!(frame.topology().atoms()[0].atom_type(), "1");
        assert_eq!(frame.topology().atoms()[0].charge(), -0.8);
        assert!((frame.positions()[1] - Vector3D::new(1.5, 2.5, 3.5)).norm() < 1e-12);
        let velocities = frame.velocities().unwrap();
        assert!((velocities[0] - Vector3D::new(0.1, 0.0, 0.0)).norm() < 1e-12);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_write_generates_types() {
        let path = temp_path("types.lammpstrj");
        {
            let mut format = factory(&path, Mode::Write).unwrap();
            let mut frame = Frame::new();
            frame.add_atom(Atom::new("C"), Vector3D::zeros(), None);
            frame.add_atom(Atom::new("H"), Vector3D::new(1.0, 0.0, 0.0), None);
            frame.add_atom(Atom::new("C"), Vector3D::new(2.0, 0.0, 0.0), None);
            format.write(&frame).unwrap();
        }

        let mut format = factory(&path, Mode::Read).unwrap();
        let mut frame = Frame::new();
        format.read(&mut frame).unwrap();
        // the same generated type for both carbons
        assert_eq!(
            frame.topology().atoms()[0].atom_type(),
            frame.topology().atoms()[2].atom_type()
        );
        assert_ne!(
            frame.topology().atoms()[0].atom_type(),
            frame.topology().atoms()[1].atom_type()
        );

        std::fs::remove_file(&path).unwrap();
    }
}
