//! Embedded preset files
//!
//! The example session and measurement ship inside the binary. `init`
//! extracts them so they can be edited; `read` falls back to the embedded
//! copy when no file exists on disk.

use rust_embed::RustEmbed;
use std::borrow::Cow;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Embedded presets (session and measurement files)
#[derive(RustEmbed)]
#[folder = "presets/"]
#[include = "*.yaml"]
struct EmbeddedPresets;

/// Name of the embedded example session
pub const SESSION_PRESET: &str = "session.yaml";

/// Report of init (extraction) operations
#[derive(Debug, Default)]
pub struct InitReport {
    pub written: Vec<String>,
    pub skipped: Vec<String>,
}

/// Preset loader with optional filesystem override
pub struct PresetLoader {
    /// External presets directory
    dir: Option<PathBuf>,
}

impl PresetLoader {
    /// Paths should be `Some` only if a directory was configured.
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self { dir }
    }

    /// Read a preset, trying the filesystem first when a directory is set.
    pub fn read(&self, name: &str) -> io::Result<Cow<'static, [u8]>> {
        if let Some(ref dir) = self.dir {
            let full_path = dir.join(name);
            if full_path.exists() {
                tracing::trace!(path = %full_path.display(), "Loading preset from filesystem");
                return Ok(Cow::Owned(fs::read(&full_path)?));
            }
        }

        EmbeddedPresets::get(name)
            .map(|f| {
                tracing::trace!(name, "Loading preset from embedded assets");
                f.data
            })
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, format!("Preset not found: {name}"))
            })
    }

    /// Read a preset as a UTF-8 string
    pub fn read_string(&self, name: &str) -> io::Result<String> {
        let bytes = self.read(name)?;
        String::from_utf8(bytes.into_owned())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    /// Extract embedded presets (init command)
    ///
    /// Uses the configured directory, or the current directory if not set.
    pub fn init(&self, force: bool) -> io::Result<InitReport> {
        let mut report = InitReport::default();
        let dir = self.dir.clone().unwrap_or_else(|| PathBuf::from("."));
        fs::create_dir_all(&dir)?;

        for file in EmbeddedPresets::iter() {
            let path = dir.join(file.as_ref());
            if !force && path.exists() {
                report.skipped.push(path.display().to_string());
                continue;
            }
            if let Some(data) = EmbeddedPresets::get(&file) {
                fs::write(&path, &*data.data)?;
                report.written.push(path.display().to_string());
            }
        }

        if !report.written.is_empty() {
            tracing::info!(
                dir = %dir.display(),
                count = report.written.len(),
                "Extracted embedded presets"
            );
        }
        Ok(report)
    }

    /// List embedded presets (for display)
    pub fn list_embedded() -> Vec<String> {
        let mut names: Vec<String> = EmbeddedPresets::iter().map(|s| s.to_string()).collect();
        names.sort();
        names
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }
}
