//! XYZ file format
//!
//! The simplest of the text trajectory formats: a number of atoms, a
//! comment line, then one `name x y z` line per atom, repeated for
//! every step.

use std::path::Path;

use crate::core::atom::Atom;
use crate::core::frame::Frame;
use crate::core::math::Vector3D;
use crate::errors::{Error, Result};
use crate::io::registry::FormatMetadata;
use crate::io::text::{parse, print_file, TextFile, TextFormat, TextFormatImpl};
use crate::io::trajectory::Mode;
use crate::io::Format;

/// Metadata for the XYZ format
pub fn metadata() -> FormatMetadata {
    FormatMetadata {
        name: "XYZ",
        extension: Some(".xyz"),
        description: "XYZ text format",
        read: true,
        write: true,
        memory: true,
        positions: true,
        velocities: false,
        unit_cell: false,
        atoms: true,
        bonds: false,
        residues: false,
    }
}

/// Build an XYZ format implementation for the file at `path`
pub fn factory(path: &Path, mode: Mode) -> Result<Box<dyn Format>> {
    Ok(Box::new(TextFormat::new(path, mode, XyzFormat)?))
}

struct XyzFormat;

impl TextFormatImpl for XyzFormat {
    fn name(&self) -> &'static str {
        "XYZ"
    }

    fn forward(&mut self, file: &mut TextFile) -> Result<Option<u64>> {
        let position = file.tellpos()?;
        let line = file.readline()?;
        if line.trim().is_empty() || file.eof() {
            return Ok(None);
        }

        let natoms: usize = parse(&line).map_err(|_| {
            Error::format(format!(
                "could not parse the number of atoms in '{}' for XYZ format",
                line
            ))
        })?;

        for _ in 0..natoms + 1 {
            file.readline()?;
            if file.eof() {
                return Err(Error::format(
                    "not enough lines in XYZ format for the number of atoms",
                ));
            }
        }
        Ok(Some(position))
    }

    fn read_next(&mut self, file: &mut TextFile, frame: &mut Frame) -> Result<()> {
        let natoms: usize = parse(&file.readline()?)?;
        let comment = file.readline()?;
        if !comment.trim().is_empty() {
            frame.set("name", comment.trim());
        }

        frame.resize(natoms)?;
        for i in 0..natoms {
            let line = file.readline()?;
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 4 {
                return Err(Error::format(format!(
                    "XYZ atom line has {} fields, expected at least 4: '{}'",
                    fields.len(),
                    line
                )));
            }
            if let Some(atom) = frame.topology_mut().atom_mut(i) {
                *atom = Atom::new(fields[0]);
            }
            frame.positions_mut()[i] = Vector3D::new(
                parse(fields[1])?,
                parse(fields[2])?,
                parse(fields[3])?,
            );
        }
        Ok(())
    }

    fn write_next(&mut self, file: &mut TextFile, frame: &Frame) -> Result<()> {
        let comment = frame
            .get("name")
            .and_then(|p| p.as_string().ok())
            .unwrap_or("");
        print_file!(file, "{}\n{}\n", frame.size(), comment)?;

        let positions = frame.positions();
        for (i, atom) in frame.topology().atoms().iter().enumerate() {
            let name = if atom.name().is_empty() { "X" } else { atom.name() };
            print_file!(
                file,
                "{} {:.6} {:.6} {:.6}\n",
                name,
                positions[i][0],
                positions[i][1],
                positions[i][2]
            )?;
        }
        Ok(())
    }
}
