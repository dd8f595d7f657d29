//! Trajectory driver, format registry and codecs
//!
//! This module maps files to frames. A [`Trajectory`] owns one format
//! implementation, selected by file extension or explicit name through
//! the [`FormatRegistry`]. Every format implements the [`Format`] trait:
//! step counting, sequential and random-access reads, and append-only
//! writes.

pub mod amber;
pub mod lammps;
pub mod netcdf3;
pub mod registry;
pub mod text;
pub mod trajectory;
pub mod trr;
pub mod xdr;
pub mod xtc;
pub mod xyz;

pub use registry::{FormatMetadata, FormatRegistry};
pub use trajectory::{Mode, Trajectory};

use crate::core::frame::Frame;
use crate::errors::Result;

/// The contract every file format implements
pub trait Format {
    /// Number of steps (frames) in the file
    fn nsteps(&mut self) -> usize;

    /// Read the next step into `frame`, advancing the internal cursor
    fn read(&mut self, frame: &mut Frame) -> Result<()>;

    /// Read the given step into `frame`, moving the internal cursor
    fn read_step(&mut self, step: usize, frame: &mut Frame) -> Result<()>;

    /// Append `frame` to the file
    fn write(&mut self, frame: &Frame) -> Result<()>;

    /// Write any trailing data the format needs before the file closes.
    ///
    /// Called once when the owning trajectory is closed or dropped.
    fn finalize(&mut self) -> Result<()> {
        Ok(())
    }
}
