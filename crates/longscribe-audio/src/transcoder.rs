use longscribe_core::config::TranscoderConfig;
use longscribe_core::{AudioEncoding, TranscodeError};
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// A local file normalized for recognition.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodedAudio {
    pub path: PathBuf,
    pub encoding: AudioEncoding,
    pub sample_rate_hertz: u32,
    pub channels: u16,
}

/// Runs an external encoder to produce mono FLAC at a fixed rate.
pub struct Transcoder {
    program: String,
    args: Vec<String>,
    sample_rate: u32,
    channels: u16,
    scratch_dir: PathBuf,
}

impl Transcoder {
    pub fn new(config: &TranscoderConfig, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            sample_rate: config.sample_rate,
            channels: config.channels,
            scratch_dir: scratch_dir.into(),
        }
    }

    /// Scratch directory private to this process under the system temp dir.
    pub fn default_scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("longscribe-{}", std::process::id()))
    }

    pub fn output_path_for(&self, input: &Path) -> PathBuf {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".to_string());
        self.scratch_dir.join(format!("{stem}.flac"))
    }

    fn expand_args(&self, input: &Path, output: &Path) -> Vec<String> {
        let input = input.to_string_lossy();
        let output = output.to_string_lossy();
        let channels = self.channels.to_string();
        let sample_rate = self.sample_rate.to_string();
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{input}", &input)
                    .replace("{output}", &output)
                    .replace("{channels}", &channels)
                    .replace("{sample_rate}", &sample_rate)
            })
            .collect()
    }

    pub async fn transcode(&self, input: &Path) -> Result<TranscodedAudio, TranscodeError> {
        tokio::fs::create_dir_all(&self.scratch_dir).await?;
        let output = self.output_path_for(input);
        // A stale file from an earlier run must not pass for fresh output.
        if tokio::fs::try_exists(&output).await? {
            tokio::fs::remove_file(&output).await?;
        }

        let args = self.expand_args(input, &output);
        tracing::debug!(program = %self.program, ?args, "running transcoder");

        let result = Command::new(&self.program)
            .args(&args)
            .stdin(std::process::Stdio::null())
            .output()
            .await
            .map_err(|source| TranscodeError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !result.status.success() {
            return Err(TranscodeError::Failed {
                status: result.status.to_string(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }

        if !tokio::fs::try_exists(&output).await? {
            return Err(TranscodeError::MissingOutput(output.display().to_string()));
        }

        tracing::info!(
            input = %input.display(),
            output = %output.display(),
            sample_rate = self.sample_rate,
            channels = self.channels,
            "transcoded audio"
        );

        Ok(TranscodedAudio {
            path: output,
            encoding: AudioEncoding::Flac,
            sample_rate_hertz: self.sample_rate,
            channels: self.channels,
        })
    }
}
