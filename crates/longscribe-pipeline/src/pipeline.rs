use chrono::Utc;
use longscribe_audio::Transcoder;
use longscribe_core::{
    object_name, AppConfig, AsrError, AudioInput, DestinationError, RemoteObject, StorageError,
    TranscodeError,
};
use longscribe_destination::CsvDestination;
use longscribe_engine::{submit, SpeechService};
use longscribe_storage::StagingBucket;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::oneshot;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("transcoding failed: {0}")]
    Transcode(#[from] TranscodeError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("speech service error: {0}")]
    Asr(#[from] AsrError),

    #[error("recognition failed: {0}")]
    Operation(String),

    #[error("could not save transcript: {0}")]
    Output(#[from] DestinationError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub operation: String,
    pub rows: usize,
    pub output_path: PathBuf,
    pub staged: Option<RemoteObject>,
}

/// Transcode, stage, recognize, save, clean up.
pub struct Pipeline {
    config: AppConfig,
    service: Arc<dyn SpeechService>,
    staging: Option<StagingBucket>,
    transcoder: Transcoder,
    echo: bool,
}

impl Pipeline {
    pub fn new(config: AppConfig, service: Arc<dyn SpeechService>) -> Self {
        let transcoder = Transcoder::new(&config.transcoder, Transcoder::default_scratch_dir());
        Self {
            config,
            service,
            staging: None,
            transcoder,
            echo: true,
        }
    }

    /// Bucket for local inputs. Remote inputs never touch it.
    pub fn with_staging(mut self, bucket: StagingBucket) -> Self {
        self.staging = Some(bucket);
        self
    }

    pub fn with_transcoder(mut self, transcoder: Transcoder) -> Self {
        self.transcoder = transcoder;
        self
    }

    /// Echo rows to stdout while writing them (on by default).
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub async fn run(
        &self,
        input: &AudioInput,
        output: &Path,
    ) -> Result<RunSummary, PipelineError> {
        let (uri, staged, audio) = match input {
            AudioInput::Remote(object) => {
                tracing::info!(uri = %object, "using remote audio as-is");
                (object.uri(), None, None)
            }
            AudioInput::Local(path) => {
                let bucket = self.staging.as_ref().ok_or_else(|| {
                    StorageError::InitializationFailed(
                        "no staging bucket for local audio".to_string(),
                    )
                })?;
                let audio = self.transcoder.transcode(path).await?;
                let name = object_name(&audio.path, Utc::now());
                let uploaded = bucket.upload(&audio.path, &name).await;
                discard_scratch(&audio.path).await;
                let object = uploaded?;
                (
                    object.uri(),
                    Some(object),
                    Some((audio.encoding, audio.sample_rate_hertz, audio.channels)),
                )
            }
        };

        let request = self.config.recognition_request(audio);
        let submitted = submit(
            Arc::clone(&self.service),
            &request,
            &uri,
            self.config.operation.poll_interval(),
        )
        .await;
        let mut operation = match submitted {
            Ok(operation) => operation,
            Err(e) => {
                // No job will ever read the staged copy.
                if let (Some(object), Some(bucket)) = (&staged, &self.staging) {
                    if let Err(del) = bucket.delete(object).await {
                        tracing::error!(uri = %object, "failed to delete staged audio: {del}");
                    }
                }
                return Err(e.into());
            }
        };
        tracing::info!(operation = operation.name(), "transcribing");

        let (saved_tx, saved_rx) = oneshot::channel();
        let destination = CsvDestination::new(output);
        let echo = self.echo;
        operation.add_done_callback(move |outcome| async move {
            let saved = match &*outcome {
                Ok(response) => {
                    let segments = &response.segments;
                    let written = if echo {
                        destination.write_segments(segments, &mut std::io::stdout())
                    } else {
                        destination.write_segments(segments, &mut std::io::sink())
                    };
                    Some(written)
                }
                Err(failure) => {
                    tracing::warn!("no transcript to save: {failure}");
                    None
                }
            };
            let _ = saved_tx.send(saved);
        });

        if let (Some(object), Some(bucket)) = (staged.clone(), self.staging.clone()) {
            operation.add_done_callback(move |_outcome| async move {
                if let Err(e) = bucket.delete(&object).await {
                    tracing::error!(uri = %object, "failed to delete staged audio: {e}");
                }
            });
        }

        let outcome = match operation.wait(self.config.operation.timeout()).await {
            Ok(outcome) => outcome,
            Err(e) => {
                if let Some(object) = &staged {
                    tracing::warn!(uri = %object, "job still running, staged audio left in place");
                }
                return Err(e.into());
            }
        };

        if let Err(failure) = &*outcome {
            return Err(PipelineError::Operation(failure.to_string()));
        }

        let rows = match saved_rx.await {
            Ok(Some(saved)) => saved?,
            Ok(None) | Err(_) => {
                let missing = "transcript callback did not run".to_string();
                let err = DestinationError::WriteFailed(missing);
                return Err(err.into());
            }
        };

        Ok(RunSummary {
            operation: operation.name().to_string(),
            rows,
            output_path: output.to_path_buf(),
            staged,
        })
    }
}

async fn discard_scratch(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        tracing::debug!(path = %path.display(), "could not remove scratch file: {e}");
    }
    if let Some(dir) = path.parent() {
        // Only succeeds once the directory is empty.
        let _ = tokio::fs::remove_dir(dir).await;
    }
}
