//! Text file support and the generic text format scaffold
//!
//! Text trajectory formats rarely carry an index of their steps. The
//! [`TextFormat`] scaffold runs a one-time forward scan at construction,
//! recording the byte offset every step starts at, which turns every
//! later `read_step` into a seek instead of a rewind-and-reparse.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::core::frame::Frame;
use crate::errors::{Error, Result};
use crate::io::trajectory::Mode;
use crate::io::Format;

/// Parse a value from a string, converting failures to format errors
pub(crate) fn parse<T>(value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e| {
        Error::format(format!("can not parse '{}': {}", value.trim(), e))
    })
}

/// A line-oriented text file with position tracking
pub struct TextFile {
    reader: BufReader<File>,
    path: PathBuf,
    eof: bool,
}

impl TextFile {
    /// Open the file at `path` in the given mode
    pub fn open(path: &Path, mode: Mode) -> Result<TextFile> {
        let file = match mode {
            Mode::Read => File::open(path)?,
            Mode::Write => OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(true)
                .open(path)?,
            Mode::Append => OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .open(path)?,
        };
        Ok(TextFile {
            reader: BufReader::new(file),
            path: path.to_path_buf(),
            eof: false,
        })
    }

    /// The path of this file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read one line, without the trailing newline. At the end of the
    /// file this returns an empty string and sets the EOF flag.
    pub fn readline(&mut self) -> Result<String> {
        let mut line = String::new();
        let read = self.reader.read_line(&mut line)?;
        if read == 0 {
            self.eof = true;
        }
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok(line)
    }

    /// Whether the last `readline` hit the end of the file
    pub fn eof(&self) -> bool {
        self.eof
    }

    /// The current byte offset in the file
    pub fn tellpos(&mut self) -> Result<u64> {
        Ok(self.reader.stream_position()?)
    }

    /// Move the cursor to the given byte offset
    pub fn seek(&mut self, position: u64) -> Result<()> {
        self.reader.seek(SeekFrom::Start(position))?;
        self.eof = false;
        Ok(())
    }

    /// Move the cursor to the end of the file, ready to append
    pub fn seek_end(&mut self) -> Result<u64> {
        let position = self.reader.seek(SeekFrom::End(0))?;
        Ok(position)
    }

    /// Write formatted text at the current position
    pub fn print(&mut self, args: std::fmt::Arguments<'_>) -> Result<()> {
        self.reader.get_mut().write_fmt(args)?;
        Ok(())
    }
}

/// Convenience macro writing formatted text to a [`TextFile`]
macro_rules! print_file {
    ($file:expr, $($arg:tt)*) => {
        $file.print(format_args!($($arg)*))
    };
}
pub(crate) use print_file;

/// The step-level operations a concrete text format provides
pub trait TextFormatImpl {
    /// Static metadata about the format, used in error messages
    fn name(&self) -> &'static str;

    /// Read exactly one step from the current position and return the
    /// byte offset it started at, or `None` at the end of the file
    fn forward(&mut self, file: &mut TextFile) -> Result<Option<u64>>;

    /// Parse one step from the current position into `frame`
    fn read_next(&mut self, file: &mut TextFile, frame: &mut Frame) -> Result<()>;

    /// Serialize `frame` at the current position
    fn write_next(&mut self, file: &mut TextFile, frame: &Frame) -> Result<()>;
}

/// Generic driver for text formats: owns the file, the step offsets
/// and the cursor
pub struct TextFormat<T: TextFormatImpl> {
    file: TextFile,
    imp: T,
    offsets: Vec<u64>,
    step: usize,
}

impl<T: TextFormatImpl> TextFormat<T> {
    /// Open `path` in the given mode. In read and append modes this
    /// scans the whole file once to index the steps.
    pub fn new(path: &Path, mode: Mode, imp: T) -> Result<TextFormat<T>> {
        let mut format = TextFormat {
            file: TextFile::open(path, mode)?,
            imp,
            offsets: Vec::new(),
            step: 0,
        };

        if mode != Mode::Write {
            while let Some(offset) = format.imp.forward(&mut format.file)? {
                format.offsets.push(offset);
            }
            format.file.seek(0)?;
            tracing::debug!(
                "{}: indexed {} steps in '{}'",
                format.imp.name(),
                format.offsets.len(),
                path.display()
            );
        }
        Ok(format)
    }
}

impl<T: TextFormatImpl> Format for TextFormat<T> {
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
                "step {} in a {} file with {} steps",
                step,
                self.imp.name(),
                self.offsets.len()
            ))
        })?;
        self.file.seek(offset)?;
        self.imp.read_next(&mut self.file, frame)?;
        self.step = step + 1;
        Ok(())
    }

    fn write(&mut self, frame: &Frame) -> Result<()> {
        let offset = self.file.seek_end()?;
        self.imp.write_next(&mut self.file, frame)?;
        self.offsets.push(offset);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(parse::<i64>(" 42 ").unwrap(), 42);
        assert_eq!(parse::<f64>("-1.5e3").unwrap(), -1500.0);
        assert!(parse::<usize>("four").is_err());
    }

    #[test]
    fn test_readline_and_positions() {
        let path = std::env::temp_dir().join(format!("molio-textfile-{}", std::process::id()));
        std::fs::write(&path, "first\nsecond\nthird\n").unwrap();

        let mut file = TextFile::open(&path, Mode::Read).unwrap();
        assert_eq!(file.readline().unwrap(), "first");
        let position = file.tellpos().unwrap();
        assert_eq!(file.readline().unwrap(), "second");
        file.seek(position).unwrap();
        assert_eq!(file.readline().unwrap(), "second");
        assert_eq!(file.readline().unwrap(), "third");
        assert!(!file.eof());
        assert_eq!(file.readline().unwrap(), "");
        assert!(file.eof());

        std::fs::remove_file(&path).unwrap();
    }
}
