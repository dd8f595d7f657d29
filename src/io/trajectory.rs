//! The trajectory driver: mode-aware file opening and step bookkeeping

use std::path::{Path, PathBuf};

use crate::core::frame::Frame;
use crate::errors::{Error, Result};
use crate::io::registry::{FormatMetadata, FormatRegistry};
use crate::io::Format;
use crate::warnings::warning;

/// The mode a trajectory is opened in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Open an existing file for reading
    Read,
    /// Create or truncate a file for writing
    Write,
    /// Open or create a file, appending new frames at the end
    Append,
}

/// A trajectory file: a sequence of frames behind a format
/// implementation selected from the file extension or an explicit
/// format name.
pub struct Trajectory {
    format: Box<dyn Format>,
    metadata: FormatMetadata,
    path: PathBuf,
    mode: Mode,
    step: usize,
    finalized: bool,
}

impl std::fmt::Debug for Trajectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Trajectory")
            .field("metadata", &self.metadata)
            .field("path", &self.path)
            .field("mode", &self.mode)
            .field("step", &self.step)
            .field("finalized", &self.finalized)
            .finish()
    }
}

impl Trajectory {
    /// Open the file at `path`, selecting the format from the file
    /// extension in the default registry
    pub fn open(path: impl AsRef<Path>, mode: Mode) -> Result<Trajectory> {
        Trajectory::open_with_registry(path, mode, None, FormatRegistry::global())
    }

    /// Open the file at `path` with an explicitly named format
    pub fn open_with_format(
        path: impl AsRef<Path>,
        mode: Mode,
        format: &str,
    ) -> Result<Trajectory> {
        Trajectory::open_with_registry(path, mode, Some(format), FormatRegistry::global())
    }

    /// Open the file at `path` resolving the format in a caller-provided
    /// registry
    pub fn open_with_registry(
        path: impl AsRef<Path>,
        mode: Mode,
        format: Option<&str>,
        registry: &FormatRegistry,
    ) -> Result<Trajectory> {
        let path = path.as_ref();
        let (metadata, factory) = match format {
            Some(name) => registry.by_name(name)?,
            None => registry.for_path(path)?,
        };

        match mode {
            Mode::Read if !metadata.read => {
                return Err(Error::format(format!(
                    "the {} format does not support reading",
                    metadata.name
                )));
            }
            Mode::Write | Mode::Append if !metadata.write => {
                return Err(Error::format(format!(
                    "the {} format does not support writing",
                    metadata.name
                )));
            }
            _ => {}
        }

        let format = factory(path, mode)?;
        let mut trajectory = Trajectory {
            format,
            metadata,
            path: path.to_path_buf(),
            mode,
            step: 0,
            finalized: false,
        };
        if mode == Mode::Append {
            // start writing after any pre-existing frames
            trajectory.step = trajectory.format.nsteps();
        }
        Ok(trajectory)
    }

    /// The path of the underlying file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The metadata of the format backing this trajectory
    pub fn metadata(&self) -> &FormatMetadata {
        &self.metadata
    }

    /// The mode this trajectory was opened in
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Number of steps (frames) in the file
    pub fn nsteps(&mut self) -> usize {
        self.format.nsteps()
    }

    /// Check whether all the frames were read
    pub fn done(&mut self) -> bool {
        self.step >= self.format.nsteps()
    }

    /// Read the next frame, advancing the internal step counter
    pub fn read(&mut self) -> Result<Frame> {
        self.check_mode_reads()?;
        if self.done() {
            return Err(Error::format(format!(
                "can not read file '{}' past the end: it contains {} steps",
                self.path.display(),
                self.format.nsteps()
            )));
        }
        let mut frame = Frame::new();
        self.format.read(&mut frame)?;
        self.step += 1;
        Ok(frame)
    }

    /// Read the frame at the given step, resetting the internal step
    /// counter so that `read` continues from `step + 1`
    pub fn read_step(&mut self, step: usize) -> Result<Frame> {
        self.check_mode_reads()?;
        let nsteps = self.format.nsteps();
        if step >= nsteps {
            return Err(Error::out_of_bounds(format!(
                "step {} in file '{}' which contains {} steps",
                step,
                self.path.display(),
                nsteps
            )));
        }
        let mut frame = Frame::new();
        self.format.read_step(step, &mut frame)?;
        self.step = step + 1;
        Ok(frame)
    }

    /// Append a frame to the file
    pub fn write(&mut self, frame: &Frame) -> Result<()> {
        if self.mode == Mode::Read {
            return Err(Error::format(format!(
                "the file at '{}' was opened in read mode, can not write to it",
                self.path.display()
            )));
        }
        self.format.write(frame)?;
        self.step += 1;
        Ok(())
    }

    /// Close the trajectory, writing any pending footer.
    ///
    /// Dropping the trajectory does the same, but an explicit call
    /// surfaces errors instead of logging them.
    pub fn close(mut self) -> Result<()> {
        self.finalized = true;
        self.format.finalize()
    }

    fn check_mode_reads(&self) -> Result<()> {
        if self.mode != Mode::Read {
            return Err(Error::format(format!(
                "the file at '{}' was opened in write mode, can not read from it",
                self.path.display()
            )));
        }
        Ok(())
    }
}

impl Drop for Trajectory {
    fn drop(&mut self) {
        if !self.finalized {
            if let Err(error) = self.format.finalize() {
                warning(
                    "trajectory",
                    format!(
                        "error while closing the file at '{}': {}",
                        self.path.display(),
                        error
                    ),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_suggestion() {
        let error = Trajectory::open_with_format("/tmp/missing.xyz", Mode::Read, "XYX")
            .unwrap_err()
            .to_string();
        assert!(error.contains("'XYX'"));
        // 'XYZ' must be offered, possibly along with other close names
        assert!(error.contains("Did you mean"), "got: {}", error);
        assert!(error.contains("'XYZ'"), "got: {}", error);
    }

    #[test]
    fn test_unknown_extension() {
        let error = Trajectory::open("/tmp/file.nope", Mode::Read).unwrap_err();
        assert!(matches!(error, Error::Format(_)));
    }
}
