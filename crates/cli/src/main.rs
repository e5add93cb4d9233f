// crates/cli/src/main.rs
//! Stemsplit CLI binary.
//!
//! Splits a local audio file into vocal and instrumental stems without
//! going through the HTTP server: the engine runs against a temporary
//! scratch directory and the results land next to each other in the
//! output directory, named after the input file.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use stemsplit_core::{
    is_supported_extension, normalized_extension, DemucsEngine, SeparationEngine,
    SeparatorConfig, SUPPORTED_EXTENSIONS,
};
use tokio::fs;
use tracing_subscriber::EnvFilter;

/// Split an audio file into vocal and instrumental stems.
#[derive(Debug, Parser)]
#[command(name = "stemsplit-cli", version)]
struct Args {
    /// Input audio file (.mp3/.wav/.m4a/.flac/.ogg/.aac).
    input: PathBuf,

    /// Directory to store generated wav files.
    #[arg(short, long, default_value = "outputs")]
    output_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let args = Args::parse();
    let (vocals, instrumental) = separate_file(&args.input, &args.output_dir).await?;

    println!("Vocals saved to: {}", vocals.display());
    println!("Instrumental saved to: {}", instrumental.display());
    Ok(())
}

async fn separate_file(input: &Path, output_dir: &Path) -> Result<(PathBuf, PathBuf)> {
    if !input.is_file() {
        bail!("input file not found: {}", input.display());
    }
    let filename = input
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    match normalized_extension(filename) {
        Some(extension) if is_supported_extension(&extension) => {}
        _ => bail!(
            "unsupported file type: {} (expected one of .{})",
            input.display(),
            SUPPORTED_EXTENSIONS.join(" .")
        ),
    }

    let engine = DemucsEngine::new(&SeparatorConfig::from_env());
    let scratch = tempfile::Builder::new()
        .prefix("stemsplit-")
        .tempdir()
        .context("failed to create scratch directory")?;

    let stems = engine.separate(input, scratch.path()).await?;

    fs::create_dir_all(output_dir)
        .await
        .with_context(|| format!("failed to create output directory {}", output_dir.display()))?;

    let base = input
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("track");
    let vocals_dest = output_dir.join(format!("{base}_vocals.wav"));
    let instrumental_dest = output_dir.join(format!("{base}_instrumental.wav"));

    move_file(&stems.vocals, &vocals_dest).await?;
    move_file(&stems.instrumental, &instrumental_dest).await?;

    Ok((vocals_dest, instrumental_dest))
}

/// Move a file, falling back to copy+remove when rename crosses
/// filesystems (the scratch directory usually lives on tmpfs).
async fn move_file(from: &Path, to: &Path) -> Result<()> {
    if fs::rename(from, to).await.is_ok() {
        return Ok(());
    }
    fs::copy(from, to)
        .await
        .with_context(|| format!("failed to move {} to {}", from.display(), to.display()))?;
    fs::remove_file(from)
        .await
        .with_context(|| format!("failed to remove {}", from.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_args_parse_defaults() {
        let args = Args::try_parse_from(["stemsplit-cli", "song.mp3"]).unwrap();
        assert_eq!(args.input, PathBuf::from("song.mp3"));
        assert_eq!(args.output_dir, PathBuf::from("outputs"));
    }

    #[test]
    fn test_args_parse_output_dir() {
        let args =
            Args::try_parse_from(["stemsplit-cli", "song.mp3", "-o", "/tmp/stems"]).unwrap();
        assert_eq!(args.output_dir, PathBuf::from("/tmp/stems"));

        let args = Args::try_parse_from(["stemsplit-cli"]);
        assert!(args.is_err(), "input is required");
    }

    #[tokio::test]
    async fn test_separate_file_rejects_missing_input() {
        let tmp = TempDir::new().unwrap();
        let err = separate_file(&tmp.path().join("ghost.mp3"), tmp.path())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_separate_file_rejects_unsupported_extension() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("clip.xyz");
        std::fs::write(&input, b"bytes").unwrap();

        let err = separate_file(&input, tmp.path()).await.unwrap_err();
        assert!(err.to_string().contains("unsupported file type"));
    }

    #[tokio::test]
    async fn test_move_file_within_directory() {
        let tmp = TempDir::new().unwrap();
        let from = tmp.path().join("a.wav");
        let to = tmp.path().join("b.wav");
        std::fs::write(&from, b"stem").unwrap();

        move_file(&from, &to).await.unwrap();
        assert!(!from.exists());
        assert_eq!(std::fs::read(&to).unwrap(), b"stem");
    }
}
