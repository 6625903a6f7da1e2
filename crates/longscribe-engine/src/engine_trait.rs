use async_trait::async_trait;
use longscribe_core::{AsrError, RecognitionRequest, RecognitionResponse};

/// Why a remote job ended without a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationFailure {
    pub code: i32,
    pub message: String,
}

impl std::fmt::Display for OperationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "code {}: {}", self.code, self.message)
    }
}

/// One observation of a long-running job.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationPoll {
    Running { progress_percent: Option<u32> },
    Done(Result<RecognitionResponse, OperationFailure>),
}

/// A speech service that runs recognition as a long-running operation.
#[async_trait]
pub trait SpeechService: Send + Sync {
    /// Returns the service's name (e.g. `"google"`).
    fn name(&self) -> &str;
    /// Start recognition of the audio at `audio_uri`. Returns the operation name.
    async fn submit(
        &self,
        request: &RecognitionRequest,
        audio_uri: &str,
    ) -> Result<String, AsrError>;
    /// Fetch the current state of a previously submitted operation.
    async fn poll(&self, operation: &str) -> Result<OperationPoll, AsrError>;
}
