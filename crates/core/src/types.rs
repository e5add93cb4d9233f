// crates/core/src/types.rs
//! Shared types for the separation job pipeline.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;

/// Input extensions the separation engine accepts.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["mp3", "wav", "m4a", "flac", "ogg", "aac"];

/// One of the two audio components a separation run produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stem {
    Vocals,
    Instrumental,
}

impl Stem {
    /// Canonical artifact filename inside a published job workspace.
    pub fn artifact_name(&self) -> &'static str {
        match self {
            Stem::Vocals => "vocals.wav",
            Stem::Instrumental => "instrumental.wav",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stem::Vocals => "vocals",
            Stem::Instrumental => "instrumental",
        }
    }
}

impl fmt::Display for Stem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stem {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vocals" => Ok(Stem::Vocals),
            "instrumental" => Ok(Stem::Instrumental),
            _ => Err(()),
        }
    }
}

/// Paths to the raw stem files the engine left under its scratch tree.
///
/// These are temporary locations; `JobWorkspace::publish` moves them to
/// their canonical names.
#[derive(Debug, Clone)]
pub struct SeparatedStems {
    pub vocals: PathBuf,
    pub instrumental: PathBuf,
}

/// Result of a successful submission: the job id and the two published
/// artifact locations, retrievable later by id.
#[derive(Debug, Clone, Serialize)]
pub struct CompletedJob {
    pub job_id: String,
    pub vocals: PathBuf,
    pub instrumental: PathBuf,
}

/// Extract the lowercased extension from an original filename.
///
/// Returns `None` when the filename has no extension at all.
pub fn normalized_extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

/// Whether an (already lowercased) extension is in the supported set.
pub fn is_supported_extension(extension: &str) -> bool {
    SUPPORTED_EXTENSIONS.contains(&extension)
}
