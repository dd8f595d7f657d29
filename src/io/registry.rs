//! Format registry: name and extension based format lookup

use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

use crate::errors::{Error, Result};
use crate::io::trajectory::Mode;
use crate::io::Format;

/// Static description of a format: its identity and capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatMetadata {
    /// Format name, used for explicit format selection
    pub name: &'static str,
    /// File extension, with the leading dot, if the format has one
    pub extension: Option<&'static str>,
    /// One-line description of the format
    pub description: &'static str,
    /// Whether the format supports reading
    pub read: bool,
    /// Whether the format supports writing
    pub write: bool,
    /// Whether the format can work on an in-memory buffer
    pub memory: bool,
    /// Whether the format carries positions
    pub positions: bool,
    /// Whether the format carries velocities
    pub velocities: bool,
    /// Whether the format carries a unit cell
    pub unit_cell: bool,
    /// Whether the format carries atom names/types
    pub atoms: bool,
    /// Whether the format carries bonds
    pub bonds: bool,
    /// Whether the format carries residues
    pub residues: bool,
}

/// A factory building a format implementation for a file
pub type FormatFactory = fn(&Path, Mode) -> crate::errors::Result<Box<dyn Format>>;

#[derive(Clone)]
struct FormatEntry {
    metadata: FormatMetadata,
    factory: FormatFactory,
}

/// The registry mapping format names and file extensions to factories
#[derive(Clone, Default)]
pub struct FormatRegistry {
    // keys are lower-cased for case-insensitive lookups
    by_name: HashMap<String, FormatEntry>,
    by_extension: HashMap<String, FormatEntry>,
}

impl FormatRegistry {
    /// Create an empty registry
    pub fn new() -> FormatRegistry {
        FormatRegistry::default()
    }

    /// Create a registry containing all the built-in formats
    pub fn with_default_formats() -> FormatRegistry {
        let mut registry = FormatRegistry::new();
        registry.register(crate::io::xyz::metadata(), crate::io::xyz::factory);
        registry.register(crate::io::lammps::metadata(), crate::io::lammps::factory);
        registry.register(crate::io::xtc::metadata(), crate::io::xtc::factory);
        registry.register(crate::io::trr::metadata(), crate::io::trr::factory);
        registry.register(
            crate::io::amber::trajectory_metadata(),
            crate::io::amber::trajectory_factory,
        );
        registry.register(
            crate::io::amber::restart_metadata(),
            crate::io::amber::restart_factory,
        );
        registry
    }

    /// The process-wide default registry, created on first use
    pub fn global() -> &'static FormatRegistry {
        static GLOBAL: OnceLock<FormatRegistry> = OnceLock::new();
        GLOBAL.get_or_init(FormatRegistry::with_default_formats)
    }

    /// Register a format. Registering a name or extension twice replaces
    /// the previous entry.
    pub fn register(&mut self, metadata: FormatMetadata, factory: FormatFactory) {
        let entry = FormatEntry { metadata, factory };
        self.by_name
            .insert(metadata.name.to_lowercase(), entry.clone());
        if let Some(extension) = metadata.extension {
            self.by_extension.insert(extension.to_lowercase(), entry);
        }
    }

    /// All registered formats
    pub fn formats(&self) -> Vec<FormatMetadata> {
        let mut formats: Vec<_> = self.by_name.values().map(|entry| entry.metadata).collect();
        formats.sort_by_key(|metadata| metadata.name);
        formats
    }

    /// Look up a format by name, suggesting close matches on failure
    pub fn by_name(&self, name: &str) -> Result<(FormatMetadata, FormatFactory)> {
        if let Some(entry) = self.by_name.get(&name.to_lowercase()) {
            return Ok((entry.metadata, entry.factory));
        }

        let mut suggestions: Vec<&str> = self
            .by_name
            .values()
            .map(|entry| entry.metadata.name)
            .filter(|known| edit_distance(name, known) < 4)
            .collect();
        suggestions.sort_unstable();

        let mut message = format!("can not find a format named '{}'.", name);
        if !suggestions.is_empty() {
            message.push_str(" Did you mean");
            for (i, suggestion) in suggestions.iter().enumerate() {
                if i > 0 {
                    message.push_str(" or");
                }
                message.push_str(&format!(" '{}'", suggestion));
            }
            message.push('?');
        }
        Err(Error::format(message))
    }

    /// Look up a format by file extension (including the leading dot)
    pub fn by_extension(&self, extension: &str) -> Result<(FormatMetadata, FormatFactory)> {
        match self.by_extension.get(&extension.to_lowercase()) {
            Some(entry) => Ok((entry.metadata, entry.factory)),
            None => Err(Error::format(format!(
                "can not find a format associated with the '{}' extension",
                extension
            ))),
        }
    }

    /// Look up the format for a file path, using its extension
    pub fn for_path(&self, path: &Path) -> Result<(FormatMetadata, FormatFactory)> {
        match path.extension().and_then(|e| e.to_str()) {
            Some(extension) => self.by_extension(&format!(".{}", extension)),
            None => Err(Error::format(format!(
                "file at '{}' does not have an extension, provide a format name to read it",
                path.display()
            ))),
        }
    }
}

// Edit distance between two strings with the Wagner-Fischer algorithm,
// ignoring case
fn edit_distance(first: &str, second: &str) -> usize {
    let first: Vec<char> = first.chars().flat_map(|c| c.to_lowercase()).collect();
    let second: Vec<char> = second.chars().flat_map(|c| c.to_lowercase()).collect();
    let (m, n) = (first.len() + 1, second.len() + 1);

    let mut distances = vec![vec![0usize; n]; m];
    for (i, row) in distances.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..n {
        distances[0][j] = j;
    }

    for j in 1..n {
        for i in 1..m {
            if first[i - 1] == second[j - 1] {
                distances[i][j] = distances[i - 1][j - 1];
            } else {
                distances[i][j] = 1 + distances[i - 1][j]
                    .min(distances[i][j - 1])
                    .min(distances[i - 1][j - 1]);
            }
        }
    }

    distances[m - 1][n - 1]
}
