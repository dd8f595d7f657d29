//! Gromacs TRR trajectory format
//!
//! TRR frames carry a fixed header of section sizes followed by the box,
//! positions, velocities and forces as plain big-endian floats or
//! doubles. The sizes double as presence flags: a zero `box_size` means
//! the frame has no box, and so on.

use std::path::Path;

use crate::core::frame::Frame;
use crate::core::math::Vector3D;
use crate::errors::{Error, Result};
use crate::io::registry::FormatMetadata;
use crate::io::trajectory::Mode;
use crate::io::xdr::XdrFile;
use crate::io::xtc::{box_from_cell, cell_from_box};
use crate::io::Format;

const TRR_MAGIC: i32 = 1993;
const TRR_VERSION: &str = "GMX_trn_file";

/// Metadata for the TRR format
pub fn metadata() -> FormatMetadata {
    FormatMetadata {
        name: "TRR",
        extension: Some(".trr"),
        description: "Gromacs TRR binary format",
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

/// Build a TRR format implementation for the file at `path`
pub fn factory(path: &Path, mode: Mode) -> Result<Box<dyn Format>> {
    Ok(Box::new(TrrFormat::open(path, mode)?))
}

// the fixed part of a TRR frame header, after the version string
#[derive(Debug, Clone, Copy, Default)]
struct TrrHeader {
    box_size: i32,
    vir_size: i32,
    pres_size: i32,
    x_size: i32,
    v_size: i32,
    f_size: i32,
    natoms: i32,
    step: i32,
    time: f64,
    lambda: f64,
}

impl TrrHeader {
    // the width of the floating point values in this frame, inferred
    // from the section sizes
    fn float_width(&self) -> Result<usize> {
        let width = if self.box_size > 0 {
            self.box_size as usize / 9
        } else if self.x_size > 0 {
            self.x_size as usize / (3 * self.natoms.max(1) as usize)
        } else if self.v_size > 0 {
            self.v_size as usize / (3 * self.natoms.max(1) as usize)
        } else if self.f_size > 0 {
            self.f_size as usize / (3 * self.natoms.max(1) as usize)
        } else {
            4
        };
        if width != 4 && width != 8 {
            return Err(Error::format(format!(
                "invalid float width {} in TRR frame header",
                width
            )));
        }
        Ok(width)
    }

    fn payload_size(&self) -> u64 {
        (self.box_size + self.vir_size + self.pres_size + self.x_size + self.v_size + self.f_size)
            as u64
    }
}

pub(crate) struct TrrFormat {
    file: XdrFile,
    offsets: Vec<u64>,
    natoms: usize,
    step: usize,
}

impl TrrFormat {
    fn open(path: &Path, mode: Mode) -> Result<TrrFormat> {
        let mut format = TrrFormat {
            file: XdrFile::open(path, mode)?,
            offsets: Vec::new(),
            natoms: 0,
            step: 0,
        };
        if mode != Mode::Write {
            format.scan()?;
        }
        Ok(format)
    }

    fn scan(&mut self) -> Result<()> {
        let length = self.file.len()?;
        self.file.seek(0)?;
        while self.file.tell()? < length {
            let offset = self.file.tell()?;
            let header = self.read_header()?;
            self.file.skip(header.payload_size())?;
            if self.offsets.is_empty() {
                self.natoms = header.natoms as usize;
            } else if header.natoms as usize != self.natoms {
                return Err(Error::format(format!(
                    "TRR format does not support varying numbers of atoms: expected {}, but got {}",
                    self.natoms, header.natoms
                )));
            }
            self.offsets.push(offset);
        }
        self.file.seek(0)?;
        tracing::debug!(
            "TRR: {} frames, {} atoms",
            self.offsets.len(),
            self.natoms
        );
        Ok(())
    }

    fn read_header(&mut self) -> Result<TrrHeader> {
        let magic = self.file.read_i32()?;
        if magic != TRR_MAGIC {
            return Err(Error::format(format!(
                "invalid magic number in TRR file at '{}': expected {}, got {}",
                self.file.path().display(),
                TRR_MAGIC,
                magic
            )));
        }
        let _version = self.file.read_gmx_string()?;

        let _ir_size = self.file.read_i32()?;
        let _e_size = self.file.read_i32()?;
        let box_size = self.file.read_i32()?;
        let vir_size = self.file.read_i32()?;
        let pres_size = self.file.read_i32()?;
        let _top_size = self.file.read_i32()?;
        let _sym_size = self.file.read_i32()?;
        let x_size = self.file.read_i32()?;
        let v_size = self.file.read_i32()?;
        let f_size = self.file.read_i32()?;
        let natoms = self.file.read_i32()?;
        if natoms < 0 {
            return Err(Error::format(format!(
                "invalid atom count {} in TRR frame header",
                natoms
            )));
        }
        let step = self.file.read_i32()?;
        let _nre = self.file.read_i32()?;

        let mut header = TrrHeader {
            box_size,
            vir_size,
            pres_size,
            x_size,
            v_size,
            f_size,
            natoms,
            step,
            time: 0.0,
            lambda: 0.0,
        };
        if header.float_width()? == 8 {
            header.time = self.file.read_f64()?;
            header.lambda = self.file.read_f64()?;
        } else {
            header.time = self.file.read_f32()? as f64;
            header.lambda = self.file.read_f32()? as f64;
        }
        Ok(header)
    }

    // read natoms * 3 values of the given width, in nanometre units
    fn read_vectors(&mut self, natoms: usize, width: usize) -> Result<Vec<Vector3D>> {
        let mut vectors = Vec::with_capacity(natoms);
        if width == 8 {
            let mut data = vec![0.0f64; natoms * 3];
            self.file.read_f64_array(&mut data)?;
            for i in 0..natoms {
                // factor 10 because the values are in nanometres
                vectors.push(Vector3D::new(
                    data[i * 3] * 10.0,
                    data[i * 3 + 1] * 10.0,
                    data[i * 3 + 2] * 10.0,
                ));
            }
        } else {
            let mut data = vec![0.0f32; natoms * 3];
            self.file.read_f32_array(&mut data)?;
            for i in 0..natoms {
                vectors.push(Vector3D::new(
                    data[i * 3] as f64 * 10.0,
                    data[i * 3 + 1] as f64 * 10.0,
                    data[i * 3 + 2] as f64 * 10.0,
                ));
            }
        }
        Ok(vectors)
    }
}

impl Format for TrrFormat {
    fn nsteps(&mut self) -> usize {
        self.offsets.len()
    }

    fn read(&mut self, frame: &mut Frame) -> Result<()> {
        let step = self.step;
        self.read_step(step, frame)
    }

    fn read_step(&mut self, step: usize, frame: &mut Frame) -> Result<()> {
        let offset = *self.offsets.get(step).ok_or_else(|| {
            Error::out_of_bounds(format!(
                "step {} in a TRR file with {} steps",
                step,
                self.offsets.len()
            ))
        })?;
        self.file.seek(offset)?;

        let header = self.read_header()?;
        let width = header.float_width()?;
        let natoms = header.natoms as usize;

        frame.set_step(header.step as u64);
        // time in picoseconds, lambda is the free energy coupling parameter
        frame.set("time", header.time);
        frame.set("trr_lambda", header.lambda);
        frame.set("has_positions", false);
        frame.resize(natoms)?;

        if header.box_size > 0 {
            if width == 8 {
                let mut box_nm = [0.0f64; 9];
                self.file.read_f64_array(&mut box_nm)?;
                let mut box_f32 = [0.0f32; 9];
                for (target, value) in box_f32.iter_mut().zip(&box_nm) {
                    *target = *value as f32;
                }
                frame.set_cell(cell_from_box(&box_f32));
            } else {
                let mut box_nm = [0.0f32; 9];
                self.file.read_f32_array(&mut box_nm)?;
                frame.set_cell(cell_from_box(&box_nm));
            }
        }
        if header.vir_size > 0 {
            self.file.skip(header.vir_size as u64)?;
        }
        if header.pres_size > 0 {
            self.file.skip(header.pres_size as u64)?;
        }

        if header.x_size > 0 {
            frame.set("has_positions", true);
            let positions = self.read_vectors(natoms, width)?;
            frame.positions_mut().copy_from_slice(&positions);
        }
        if header.v_size > 0 {
            frame.add_velocities();
            let velocities = self.read_vectors(natoms, width)?;
            if let Some(target) = frame.velocities_mut() {
                target.copy_from_slice(&velocities);
            }
        }
        if header.f_size > 0 {
            // forces are not part of the data model
            self.file.skip(header.f_size as u64)?;
        }

        self.step = step + 1;
        Ok(())
    }

    fn write(&mut self, frame: &Frame) -> Result<()> {
        let natoms = frame.size();
        if self.offsets.is_empty() {
            self.natoms = natoms;
        } else if natoms != self.natoms {
            return Err(Error::format(format!(
                "TRR format does not support varying numbers of atoms: expected {}, but got {}",
                self.natoms, natoms
            )));
        }

        let time = frame
            .get("time")
            .and_then(|p| p.as_double().ok())
            .unwrap_or(0.0);
        let lambda = frame
            .get("trr_lambda")
            .and_then(|p| p.as_double().ok())
            .unwrap_or(0.0);
        let has_box = frame.cell().shape() != crate::core::cell::CellShape::Infinite;
        let has_positions = frame
            .get("has_positions")
            .and_then(|p| p.as_bool().ok())
            .unwrap_or(true);
        let has_velocities = frame.velocities().is_some();

        let offset = self.file.seek_end()?;
        self.file.write_i32(TRR_MAGIC)?;
        self.file.write_gmx_string(TRR_VERSION)?;
        self.file.write_i32(0)?; // ir_size
        self.file.write_i32(0)?; // e_size
        self.file.write_i32(if has_box { 36 } else { 0 })?;
        self.file.write_i32(0)?; // vir_size
        self.file.write_i32(0)?; // pres_size
        self.file.write_i32(0)?; // top_size
        self.file.write_i32(0)?; // sym_size
        self.file
            .write_i32(if has_positions { natoms as i32 * 12 } else { 0 })?;
        self.file
            .write_i32(if has_velocities { natoms as i32 * 12 } else { 0 })?;
        self.file.write_i32(0)?; // f_size
        self.file.write_i32(natoms as i32)?;
        self.file.write_i32(frame.step() as i32)?;
        self.file.write_i32(0)?; // nre
        self.file.write_f32(time as f32)?;
        self.file.write_f32(lambda as f32)?;

        if has_box {
            self.file.write_f32_array(&box_from_cell(frame.cell()))?;
        }
        if has_positions {
            let mut data = vec![0.0f32; natoms * 3];
            for (i, position) in frame.positions().iter().enumerate() {
                // factor 10 because the values are in nanometres
                data[i * 3] = (position[0] / 10.0) as f32;
                data[i * 3 + 1] = (position[1] / 10.0) as f32;
                data[i * 3 + 2] = (position[2] / 10.0) as f32;
            }
            self.file.write_f32_array(&data)?;
        }
        if let Some(velocities) = frame.velocities() {
            let mut data = vec![0.0f32; natoms * 3];
            for (i, velocity) in velocities.iter().enumerate() {
                data[i * 3] = (velocity[0] / 10.0) as f32;
                data[i * 3 + 1] = (velocity[1] / 10.0) as f32;
                data[i * 3 + 2] = (velocity[2] / 10.0) as f32;
            }
            self.file.write_f32_array(&data)?;
        }

        self.offsets.push(offset);
        self.step += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::atom::Atom;
    use crate::core::cell::UnitCell;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("molio-trr-{}-{}", std::process::id(), name))
    }

    fn test_frame() -> Frame {
        let mut frame = Frame::with_cell(UnitCell::orthorhombic(25.0, 30.0, 35.0));
        frame.set_step(9);
        frame.set("time", 1.25);
        frame.set("trr_lambda", 0.5);
        frame.add_velocities();
        for i in 0..5 {
            frame.add_atom(
                Atom::new("Ar"),
                Vector3D::new(i as f64, i as f64 * 2.0, i as f64 * 3.0),
                Some(Vector3D::new(0.5, -0.5, i as f64)),
            );
        }
        frame
    }

    #[test]
    fn test_roundtrip() {
        let path = temp_path("roundtrip.trr");
        {
            let mut format = TrrFormat::open(&path, Mode::Write).unwrap();
            format.write(&test_frame()).unwrap();
            format.write(&test_frame()).unwrap();
        }

        let mut format = TrrFormat::open(&path, Mode::Read).unwrap();
        assert_eq!(format.nsteps(), 2);

        let mut frame = Frame::new();
        format.read(&mut frame).unwrap();
        assert_eq!(frame.step(), 9);
        assert_eq!(frame.size(), 5);
        assert!((frame.get("time").unwrap().as_double().unwrap() - 1.25).abs() < 1e-6);
        assert!((frame.get("trr_lambda").unwrap().as_double().unwrap() - 0.5).abs() < 1e-6);
        assert!(frame.get("has_positions").unwrap().as_bool().unwrap());

        let expected = test_frame();
        for (read, written) in frame.positions().iter().zip(expected.positions()) {
            assert!((read - written).norm() < 1e-5);
        }
        for (read, written) in frame
            .velocities()
            .unwrap()
            .iter()
            .zip(expected.velocities().unwrap())
        {
            assert!((read - written).norm() < 1e-5);
        }
        assert!((frame.cell().lengths() - Vector3D::new(25.0, 30.0, 35.0)).norm() < 1e-4);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_no_box_no_velocities() {
        let path = temp_path("minimal.trr");
        {
            let mut format = TrrFormat::open(&path, Mode::Write).unwrap();
            let mut frame = Frame::new();
            frame.add_atom(Atom::new("C"), Vector3D::new(1.0, 2.0, 3.0), None);
            format.write(&frame).unwrap();
        }

        let mut format = TrrFormat::open(&path, Mode::Read).unwrap();
        let mut frame = Frame::new();
        format.read(&mut frame).unwrap();
        assert_eq!(frame.cell().shape(), crate::core::cell::CellShape::Infinite);
        assert!(frame.velocities().is_none());
        assert!((frame.positions()[0] - Vector3D::new(1.0, 2.0, 3.0)).norm() < 1e-5);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_bad_magic() {
        let path = temp_path("bad.trr");
        std::fs::write(&path, [0u8; 128]).unwrap();
        assert!(TrrFormat::open(&path, Mode::Read).is_err());
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_append() {
        let path = temp_path("append.trr");
        {
            let mut format = TrrFormat::open(&path, Mode::Write).unwrap();
            format.write(&test_frame()).unwrap();
        }
        {
            let mut format = TrrFormat::open(&path, Mode::Append).unwrap();
            assert_eq!(format.nsteps(), 1);
            format.write(&test_frame()).unwrap();
        }
        let mut format = TrrFormat::open(&path, Mode::Read).unwrap();
        assert_eq!(format.nsteps(), 2);
        std::fs::remove_file(&path).unwrap();
    }
}
