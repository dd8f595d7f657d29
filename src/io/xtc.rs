//! Gromacs XTC trajectory format
//!
//! Each frame is a short XDR header (magic, atom count, step, time),
//! the box in nanometres, and the coordinates compressed with the lossy
//! codec of the XDR layer. Systems of at most 9 atoms store their
//! coordinates uncompressed, like the reference implementation does.

use std::path::Path;

use crate::core::cell::UnitCell;
use crate::core::frame::Frame;
use crate::core::math::Matrix3D;
use crate::errors::{Error, Result};
use crate::io::registry::FormatMetadata;
use crate::io::trajectory::Mode;
use crate::io::xdr::XdrFile;
use crate::io::Format;

const XTC_MAGIC: i32 = 1995;

/// Metadata for the XTC format
pub fn metadata() -> FormatMetadata {
    FormatMetadata {
        name: "XTC",
        extension: Some(".xtc"),
        description: "Gromacs XTC binary format",
        read: true,
        write: true,
        memory: false,
        positions: true,
        velocities: false,
        unit_cell: true,
        atoms: false,
        bonds: false,
        residues: false,
    }
}

/// Build an XTC format implementation for the file at `path`
pub fn factory(path: &Path, mode: Mode) -> Result<Box<dyn Format>> {
    Ok(Box::new(XtcFormat::open(path, mode)?))
}

pub(crate) struct XtcFormat {
    file: XdrFile,
    offsets: Vec<u64>,
    natoms: usize,
    step: usize,
}

impl XtcFormat {
    fn open(path: &Path, mode: Mode) -> Result<XtcFormat> {
        let mut format = XtcFormat {
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

    // index the frame offsets with one pass over the file
    fn scan(&mut self) -> Result<()> {
        let length = self.file.len()?;
        self.file.seek(0)?;
        while self.file.tell()? < length {
            let offset = self.file.tell()?;
            let natoms = self.skip_frame()?;
            if self.offsets.is_empty() {
                self.natoms = natoms;
            } else if natoms != self.natoms {
                return Err(Error::format(format!(
                    "XTC format does not support varying numbers of atoms: expected {}, but got {}",
                    self.natoms, natoms
                )));
            }
            self.offsets.push(offset);
        }
        self.file.seek(0)?;
        tracing::debug!(
            "XTC: {} frames, {} atoms",
            self.offsets.len(),
            self.natoms
        );
        Ok(())
    }

    // skip over one frame at the cursor, returning its atom count
    fn skip_frame(&mut self) -> Result<usize> {
        let magic = self.file.read_i32()?;
        if magic != XTC_MAGIC {
            return Err(Error::format(format!(
                "invalid magic number in XTC file at '{}': expected {}, got {}",
                self.file.path().display(),
                XTC_MAGIC,
                magic
            )));
        }
        let natoms = self.file.read_i32()?;
        if natoms < 0 {
            return Err(Error::format(format!(
                "invalid atom count {} in XTC file",
                natoms
            )));
        }
        let natoms = natoms as usize;
        // step, time, box
        self.file.skip(4 + 4 + 36)?;

        let natoms_again = self.file.read_i32()?;
        if natoms_again as usize != natoms {
            return Err(Error::format(
                "inconsistent atom counts in XTC frame header",
            ));
        }
        if natoms <= 9 {
            self.file.skip(natoms as u64 * 12)?;
        } else {
            // precision, minint, maxint, smallidx
            self.file.skip(4 + 12 + 12 + 4)?;
            let compressed = self.file.read_u32()? as u64;
            self.file.skip(compressed + (4 - compressed % 4) % 4)?;
        }
        Ok(natoms)
    }
}

impl Format for XtcFormat {
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
                "step {} in an XTC file with {} steps",
                step,
                self.offsets.len()
            ))
        })?;
        self.file.seek(offset)?;

        let magic = self.file.read_i32()?;
        if magic != XTC_MAGIC {
            return Err(Error::format("invalid magic number in XTC frame"));
        }
        let natoms = self.file.read_i32()? as usize;
        let md_step = self.file.read_i32()?;
        let time = self.file.read_f32()?;

        frame.set_step(md_step as u64);
        // time in picoseconds
        frame.set("time", time as f64);
        frame.resize(natoms)?;

        let mut box_nm = [0.0f32; 9];
        self.file.read_f32_array(&mut box_nm)?;
        frame.set_cell(cell_from_box(&box_nm));

        let natoms_again = self.file.read_i32()? as usize;
        if natoms_again != natoms {
            return Err(Error::format(
                "inconsistent atom counts in XTC frame header",
            ));
        }

        let mut coords = vec![0.0f32; natoms * 3];
        if natoms <= 9 {
            self.file.read_f32_array(&mut coords)?;
        } else {
            let precision = self.file.read_gmx_compressed_floats(&mut coords)?;
            frame.set("xtc_precision", precision as f64);
        }

        // coordinates are in nanometres on the wire
        for (i, position) in frame.positions_mut().iter_mut().enumerate() {
            position[0] = coords[i * 3] as f64 * 10.0;
            position[1] = coords[i * 3 + 1] as f64 * 10.0;
            position[2] = coords[i * 3 + 2] as f64 * 10.0;
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
                "XTC format does not support varying numbers of atoms: expected {}, but got {}",
                self.natoms, natoms
            )));
        }

        let time = frame
            .get("time")
            .and_then(|p| p.as_double().ok())
            .unwrap_or(0.0);
        let precision = frame
            .get("xtc_precision")
            .and_then(|p| p.as_double().ok())
            .unwrap_or(1000.0);

        let offset = self.file.seek_end()?;
        self.file.write_i32(XTC_MAGIC)?;
        self.file.write_i32(natoms as i32)?;
        self.file.write_i32(frame.step() as i32)?;
        self.file.write_f32(time as f32)?;

        self.file.write_f32_array(&box_from_cell(frame.cell()))?;

        self.file.write_i32(natoms as i32)?;
        let mut coords = vec![0.0f32; natoms * 3];
        for (i, position) in frame.positions().iter().enumerate() {
            coords[i * 3] = (position[0] / 10.0) as f32;
            coords[i * 3 + 1] = (position[1] / 10.0) as f32;
            coords[i * 3 + 2] = (position[2] / 10.0) as f32;
        }
        if natoms <= 9 {
            self.file.write_f32_array(&coords)?;
        } else {
            self.file
                .write_gmx_compressed_floats(&coords, precision as f32)?;
        }

        self.offsets.push(offset);
        self.step += 1;
        Ok(())
    }
}

// the nine floats of a Gromacs box are the lattice vectors as rows
pub(crate) fn cell_from_box(box_nm: &[f32; 9]) -> UnitCell {
    let mut matrix = Matrix3D::zeros();
    for row in 0..3 {
        for col in 0..3 {
            // factor 10 because the box is in nanometres
            matrix[(col, row)] = box_nm[row * 3 + col] as f64 * 10.0;
        }
    }
    UnitCell::from_matrix(matrix)
}

pub(crate) fn box_from_cell(cell: &UnitCell) -> [f32; 9] {
    let matrix = cell.matrix();
    let mut box_nm = [0.0f32; 9];
    for row in 0..3 {
        for col in 0..3 {
            // factor 10 because the box is in nanometres
            box_nm[row * 3 + col] = (matrix[(col, row)] / 10.0) as f32;
        }
    }
    box_nm
}
