use crate::engine_trait::SpeechService;
use crate::operation::AsyncOperation;
use longscribe_core::{AsrError, RecognitionRequest};
use std::sync::Arc;
use std::time::Duration;

/// Submit a recognition job and return its handle without waiting for it.
///
/// Rejection by the service surfaces here; failures of the job itself arrive
/// later through the returned operation.
pub async fn submit(
    service: Arc<dyn SpeechService>,
    request: &RecognitionRequest,
    audio_uri: &str,
    poll_interval: Duration,
) -> Result<AsyncOperation, AsrError> {
    let name = service.submit(request, audio_uri).await?;
    tracing::info!(
        service = service.name(),
        operation = %name,
        audio = audio_uri,
        "submitted recognition job"
    );
    Ok(AsyncOperation::spawn(service, name, poll_interval))
}
