// crates/core/src/engine.rs
//! Separation engine adapter — spawns Demucs and locates its output.
//!
//! The engine is an external process with a binary pass/fail outcome and
//! a loose output-file contract: stems land somewhere under the output
//! root with conventional names. That discovery heuristic is brittle, so
//! it lives here, behind the `SeparationEngine` trait, and nowhere else.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::fs;
use tokio::process::Command;
use walkdir::WalkDir;

use crate::config::SeparatorConfig;
use crate::error::EngineError;
use crate::types::SeparatedStems;

/// Runs one separation against one input file and one output root.
///
/// A single attempt per call — no retries; the caller decides whether to
/// surface or retry. Implementations must have no side effects beyond
/// files written under `output_root` and the process they spawn.
#[async_trait]
pub trait SeparationEngine: Send + Sync {
    async fn separate(
        &self,
        input: &Path,
        output_root: &Path,
    ) -> Result<SeparatedStems, EngineError>;
}

/// Invokes the Demucs CLI in two-stem mode.
///
/// Command shape: `{python_bin} -m demucs --two-stems=vocals -n {model}
/// -d {device} --out {output_root} {input}`.
pub struct DemucsEngine {
    python_bin: String,
    model: String,
    device: String,
}

impl DemucsEngine {
    pub fn new(config: &SeparatorConfig) -> Self {
        Self {
            python_bin: config.python_bin.clone(),
            model: config.model.clone(),
            device: config.device.clone(),
        }
    }
}

#[async_trait]
impl SeparationEngine for DemucsEngine {
    async fn separate(
        &self,
        input: &Path,
        output_root: &Path,
    ) -> Result<SeparatedStems, EngineError> {
        fs::create_dir_all(output_root)
            .await
            .map_err(|e| EngineError::io(output_root, e))?;

        tracing::info!(
            input = %input.display(),
            model = %self.model,
            device = %self.device,
            "separation engine: spawning"
        );

        let mut cmd = Command::new(&self.python_bin);
        cmd.arg("-m")
            .arg("demucs")
            .arg("--two-stems=vocals")
            .arg("-n")
            .arg(&self.model)
            .arg("-d")
            .arg(&self.device)
            .arg("--out")
            .arg(output_root)
            .arg(input)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let output = cmd
            .output()
            .await
            .map_err(|e| EngineError::Spawn { source: e })?;

        let combined = combine_output(&output.stdout, &output.stderr);
        if !output.status.success() {
            tracing::error!(
                input = %input.display(),
                exit_code = ?output.status.code(),
                output = %&combined[..combined.len().min(500)],
                "separation engine: non-zero exit"
            );
            return Err(EngineError::Failed {
                status: output.status,
                output: combined,
            });
        }

        tracing::info!(input = %input.display(), "separation engine: finished, locating stems");
        locate_stems(output_root)
    }
}

/// Find both stem files under the engine's output tree.
///
/// The vocal stem is always `vocals.wav`. The non-vocal stem is
/// `no_vocals.wav` in two-stem mode, but some models emit
/// `instrumental.wav` instead, so that name is accepted as a fallback.
/// Whichever is found is later published under the canonical
/// `instrumental.wav` name.
fn locate_stems(output_root: &Path) -> Result<SeparatedStems, EngineError> {
    let vocals = find_file(output_root, &["vocals.wav"])
        .ok_or_else(|| EngineError::stem_not_found("vocals.wav", output_root))?;
    let instrumental = find_file(output_root, &["no_vocals.wav", "instrumental.wav"])
        .ok_or_else(|| EngineError::stem_not_found("no_vocals.wav", output_root))?;
    Ok(SeparatedStems {
        vocals,
        instrumental,
    })
}

/// Recursive search for the first file matching any of `names`, tried in
/// preference order: a full pass for each name before the next.
fn find_file(root: &Path, names: &[&str]) -> Option<PathBuf> {
    for name in names {
        let hit = WalkDir::new(root)
            .into_iter()
            .filter_map(Result::ok)
            .find(|entry| {
                entry.file_type().is_file() && entry.file_name().to_str() == Some(*name)
            });
        if let Some(hit) = hit {
            return Some(hit.into_path());
        }
    }
    None
}

fn combine_output(stdout: &[u8], stderr: &[u8]) -> String {
    let stdout = String::from_utf8_lossy(stdout);
    let stderr = String::from_utf8_lossy(stderr);
    match (stdout.trim().is_empty(), stderr.trim().is_empty()) {
        (false, false) => format!("{}\n{}", stdout.trim_end(), stderr.trim_end()),
        (false, true) => stdout.trim_end().to_string(),
        (true, _) => stderr.trim_end().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_find_file_searches_recursively() {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("mdx_extra_q").join("track").join("vocals.wav");
        touch(&nested);

        assert_eq!(find_file(tmp.path(), &["vocals.wav"]), Some(nested));
        assert_eq!(find_file(tmp.path(), &["no_vocals.wav"]), None);
    }

    #[test]
    fn test_find_file_prefers_earlier_names() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("a").join("instrumental.wav"));
        touch(&tmp.path().join("b").join("no_vocals.wav"));

        // no_vocals.wav wins even though instrumental.wav sorts first.
        let hit = find_file(tmp.path(), &["no_vocals.wav", "instrumental.wav"]).unwrap();
        assert_eq!(hit.file_name().unwrap(), "no_vocals.wav");
    }

    #[test]
    fn test_locate_stems_falls_back_to_instrumental_name() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("model").join("t").join("vocals.wav"));
        touch(&tmp.path().join("model").join("t").join("instrumental.wav"));

        let stems = locate_stems(tmp.path()).unwrap();
        assert_eq!(stems.vocals.file_name().unwrap(), "vocals.wav");
        assert_eq!(stems.instrumental.file_name().unwrap(), "instrumental.wav");
    }

    #[test]
    fn test_locate_stems_missing_vocals() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("t").join("no_vocals.wav"));

        let err = locate_stems(tmp.path()).unwrap_err();
        assert!(matches!(err, EngineError::StemNotFound { .. }));
        assert!(err.to_string().contains("vocals.wav"));
    }

    #[test]
    fn test_combine_output_merges_streams() {
        assert_eq!(combine_output(b"out", b"err"), "out\nerr");
        assert_eq!(combine_output(b"out\n", b""), "out");
        assert_eq!(combine_output(b"", b"err\n"), "err");
        assert_eq!(combine_output(b"", b""), "");
    }

    // The fake-engine tests below exercise the real process plumbing with
    // a shell script standing in for `python -m demucs`.
    #[cfg(unix)]
    mod fake_engine {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        fn write_fake_engine(dir: &Path, script_body: &str) -> PathBuf {
            let path = dir.join("fake-demucs.sh");
            std::fs::write(&path, format!("#!/bin/sh\n{script_body}\n")).unwrap();
            let mut perms = std::fs::metadata(&path).unwrap().permissions();
            perms.set_mode(0o755);
            std::fs::set_permissions(&path, perms).unwrap();
            path
        }

        fn engine_for(script: &Path) -> DemucsEngine {
            DemucsEngine::new(&SeparatorConfig {
                python_bin: script.to_string_lossy().into_owned(),
                ..SeparatorConfig::default()
            })
        }

        #[tokio::test]
        async fn test_successful_run_locates_stems() {
            let tmp = TempDir::new().unwrap();
            let input = tmp.path().join("input.mp3");
            std::fs::write(&input, b"audio").unwrap();

            // The script sees the demucs argv; $9 is the --out value.
            let script = write_fake_engine(
                tmp.path(),
                r#"out="$9"
mkdir -p "$out/model/input"
printf VOX > "$out/model/input/vocals.wav"
printf INS > "$out/model/input/no_vocals.wav"
echo "separated"
"#,
            );
            let engine = engine_for(&script);

            let output_root = tmp.path().join("outputs");
            let stems = engine.separate(&input, &output_root).await.unwrap();
            assert_eq!(std::fs::read(&stems.vocals).unwrap(), b"VOX");
            assert_eq!(std::fs::read(&stems.instrumental).unwrap(), b"INS");
        }

        #[tokio::test]
        async fn test_nonzero_exit_captures_output() {
            let tmp = TempDir::new().unwrap();
            let input = tmp.path().join("input.mp3");
            std::fs::write(&input, b"audio").unwrap();

            let script = write_fake_engine(
                tmp.path(),
                r#"echo "Traceback: model blew up" >&2
exit 3
"#,
            );
            let engine = engine_for(&script);

            let err = engine
                .separate(&input, &tmp.path().join("outputs"))
                .await
                .unwrap_err();
            match err {
                EngineError::Failed { status, output } => {
                    assert_eq!(status.code(), Some(3));
                    assert!(output.contains("model blew up"));
                }
                other => panic!("expected Failed, got {other:?}"),
            }
        }

        #[tokio::test]
        async fn test_zero_exit_without_stems_is_contract_violation() {
            let tmp = TempDir::new().unwrap();
            let input = tmp.path().join("input.mp3");
            std::fs::write(&input, b"audio").unwrap();

            let script = write_fake_engine(tmp.path(), r#"echo "looked busy, wrote nothing""#);
            let engine = engine_for(&script);

            let err = engine
                .separate(&input, &tmp.path().join("outputs"))
                .await
                .unwrap_err();
            assert!(matches!(err, EngineError::StemNotFound { .. }));
        }

        #[tokio::test]
        async fn test_missing_binary_is_spawn_error() {
            let tmp = TempDir::new().unwrap();
            let engine = DemucsEngine::new(&SeparatorConfig {
                python_bin: "/nonexistent/python-binary".to_string(),
                ..SeparatorConfig::default()
            });

            let err = engine
                .separate(&tmp.path().join("input.mp3"), &tmp.path().join("outputs"))
                .await
                .unwrap_err();
            assert!(matches!(err, EngineError::Spawn { .. }));
        }
    }
}
