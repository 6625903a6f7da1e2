use async_trait::async_trait;
use futures::stream::BoxStream;
use longscribe_core::{
    Alternative, AppConfig, AsrError, AudioInput, Offset, RecognitionRequest,
    RecognitionResponse, RemoteObject, Segment, WordInfo,
};
use longscribe_engine::{OperationFailure, OperationPoll, SpeechService};
use longscribe_pipeline::{Pipeline, PipelineError};
use longscribe_storage::StagingBucket;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{
    GetOptions, GetResult, ListResult, MultipartUpload, ObjectMeta, ObjectStore,
    PutMultipartOptions, PutOptions, PutPayload, PutResult,
};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Finishes on the first poll with a fixed outcome. Records each submission
/// and whether the staged object was still present while the job ran.
struct ScriptedService {
    outcome: Result<RecognitionResponse, OperationFailure>,
    reject: bool,
    stalled: bool,
    staging: Option<StagingBucket>,
    submitted: Mutex<Vec<(RecognitionRequest, String)>>,
    present_while_running: Mutex<Vec<bool>>,
}

impl ScriptedService {
    fn new(outcome: Result<RecognitionResponse, OperationFailure>) -> Self {
        Self {
            outcome,
            reject: false,
            stalled: false,
            staging: None,
            submitted: Mutex::new(Vec::new()),
            present_while_running: Mutex::new(Vec::new()),
        }
    }

    fn watching(mut self, bucket: StagingBucket) -> Self {
        self.staging = Some(bucket);
        self
    }

    fn rejecting(mut self) -> Self {
        self.reject = true;
        self
    }

    /// Reports the job as running forever.
    fn stalled(mut self) -> Self {
        self.stalled = true;
        self
    }
}

#[async_trait]
impl SpeechService for ScriptedService {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn submit(
        &self,
        request: &RecognitionRequest,
        audio_uri: &str,
    ) -> Result<String, AsrError> {
        if self.reject {
            return Err(AsrError::SubmissionFailed("quota exceeded".to_string()));
        }
        self.submitted
            .lock()
            .unwrap()
            .push((request.clone(), audio_uri.to_string()));
        Ok("operations/1234".to_string())
    }

    async fn poll(&self, _operation: &str) -> Result<OperationPoll, AsrError> {
        if let Some(bucket) = &self.staging {
            let last = self.submitted.lock().unwrap().last().cloned();
            if let Some(object) = last.and_then(|(_, uri)| RemoteObject::parse(&uri)) {
                let present = bucket
                    .exists(&object)
                    .await
                    .map_err(|e| AsrError::PollFailed(e.to_string()))?;
                self.present_while_running.lock().unwrap().push(present);
            }
        }
        if self.stalled {
            return Ok(OperationPoll::Running {
                progress_percent: Some(40),
            });
        }
        Ok(OperationPoll::Done(self.outcome.clone()))
    }
}

/// In-memory store whose deletes always fail.
#[derive(Debug, Default)]
struct UndeletableStore {
    inner: InMemory,
}

impl std::fmt::Display for UndeletableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "UndeletableStore")
    }
}

#[async_trait]
impl ObjectStore for UndeletableStore {
    async fn put_opts(
        &self,
        location: &Path,
        payload: PutPayload,
        opts: PutOptions,
    ) -> object_store::Result<PutResult> {
        self.inner.put_opts(location, payload, opts).await
    }

    async fn put_multipart_opts(
        &self,
        location: &Path,
        opts: PutMultipartOptions,
    ) -> object_store::Result<Box<dyn MultipartUpload>> {
        self.inner.put_multipart_opts(location, opts).await
    }

    async fn get_opts(
        &self,
        location: &Path,
        options: GetOptions,
    ) -> object_store::Result<GetResult> {
        self.inner.get_opts(location, options).await
    }

    async fn delete(&self, _location: &Path) -> object_store::Result<()> {
        Err(object_store::Error::Generic {
            store: "undeletable",
            source: "permission denied".into(),
        })
    }

    fn list(&self, prefix: Option<&Path>) -> BoxStream<'static, object_store::Result<ObjectMeta>> {
        self.inner.list(prefix)
    }

    async fn list_with_delimiter(&self, prefix: Option<&Path>) -> object_store::Result<ListResult> {
        self.inner.list_with_delimiter(prefix).await
    }

    async fn copy(&self, from: &Path, to: &Path) -> object_store::Result<()> {
        self.inner.copy(from, to).await
    }

    async fn copy_if_not_exists(&self, from: &Path, to: &Path) -> object_store::Result<()> {
        self.inner.copy_if_not_exists(from, to).await
    }
}

fn response() -> RecognitionResponse {
    let segment = |text: &str, confidence: f32, seconds: i64| Segment {
        alternatives: vec![Alternative {
            transcript: text.to_string(),
            confidence,
            words: vec![WordInfo {
                word: text.split(' ').next().unwrap_or_default().to_string(),
                start_time: Offset { seconds, nanos: 0 },
                end_time: Offset {
                    seconds: seconds + 1,
                    nanos: 0,
                },
            }],
        }],
    };
    RecognitionResponse {
        segments: vec![
            segment("hello there", 0.91, 0),
            segment("general kenobi", 0.876, 65),
        ],
    }
}

fn fast_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.operation.poll_interval_ms = 5;
    config.storage.bucket = "temp-audio".to_string();
    config
}

fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(name);
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[cfg(unix)]
fn copying_transcoder(scratch_dir: PathBuf) -> longscribe_audio::Transcoder {
    let mut transcoder = longscribe_core::config::TranscoderConfig::default();
    transcoder.program = "cp".to_string();
    transcoder.args = vec!["{input}".to_string(), "{output}".to_string()];
    longscribe_audio::Transcoder::new(&transcoder, scratch_dir)
}

#[tokio::test]
async fn test_remote_input_skips_transcode_and_staging() {
    let dir = scratch("longscribe_pipeline_remote");
    let out = dir.join("vr.csv");

    let mut config = fast_config();
    // Any attempt to transcode would fail to spawn.
    config.transcoder.program = "definitely-not-an-encoder-12345".to_string();
    let service = Arc::new(ScriptedService::new(Ok(response())));
    let pipeline = Pipeline::new(config, service.clone()).with_echo(false);

    let input = AudioInput::from_arg("gs://cloud-samples-tests/speech/vr.flac").unwrap();
    let summary = pipeline.run(&input, &out).await.unwrap();

    assert_eq!(summary.rows, 2);
    assert_eq!(summary.operation, "operations/1234");
    assert!(summary.staged.is_none());

    let submitted = service.submitted.lock().unwrap();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].1, "gs://cloud-samples-tests/speech/vr.flac");
    assert_eq!(submitted[0].0.sample_rate_hertz, None);

    let csv = std::fs::read_to_string(&out).unwrap();
    assert_eq!(
        csv,
        "timestamp,confidence,transcript\n00:00:00,0.91,hello there\n00:01:05,0.88,general kenobi\n"
    );

    std::fs::remove_dir_all(&dir).unwrap();
}

#[cfg(unix)]
#[tokio::test]
async fn test_local_input_is_staged_then_deleted_after_save() {
    let dir = scratch("longscribe_pipeline_local");
    let input_path = dir.join("meeting.wav");
    std::fs::write(&input_path, b"RIFF fake audio").unwrap();
    let out = dir.join("meeting.csv");

    let bucket = StagingBucket::new(Arc::new(InMemory::new()), "temp-audio");
    let service = ScriptedService::new(Ok(response())).watching(bucket.clone());
    let service = Arc::new(service);
    let pipeline = Pipeline::new(fast_config(), service.clone())
        .with_staging(bucket.clone())
        .with_transcoder(copying_transcoder(dir.join("scratch")))
        .with_echo(false);

    let input = AudioInput::Local(input_path.clone());
    let summary = pipeline.run(&input, &out).await.unwrap();

    let staged = summary.staged.expect("local input should be staged");
    assert_eq!(staged.bucket, "temp-audio");
    assert!(staged.name.starts_with("meeting-"));
    assert!(staged.name.ends_with(".flac"));

    let submitted = service.submitted.lock().unwrap();
    assert_eq!(submitted[0].1, staged.uri());
    assert_eq!(submitted[0].0.sample_rate_hertz, Some(16000));
    assert_eq!(submitted[0].0.audio_channel_count, Some(1));

    // Present while the job ran, gone once the chain finished.
    assert_eq!(*service.present_while_running.lock().unwrap(), vec![true]);
    assert!(!bucket.exists(&staged).await.unwrap());

    assert_eq!(summary.rows, 2);
    assert!(out.exists());
    assert!(!dir.join("scratch").join("meeting.flac").exists());

    std::fs::remove_dir_all(&dir).unwrap();
}

#[cfg(unix)]
#[tokio::test]
async fn test_failed_operation_writes_nothing_but_still_cleans_up() {
    let dir = scratch("longscribe_pipeline_failed");
    let input_path = dir.join("noise.wav");
    std::fs::write(&input_path, b"RIFF fake audio").unwrap();
    let out = dir.join("noise.csv");

    let bucket = StagingBucket::new(Arc::new(InMemory::new()), "temp-audio");
    let failure = OperationFailure {
        code: 3,
        message: "bad sample rate".to_string(),
    };
    let service = Arc::new(ScriptedService::new(Err(failure)).watching(bucket.clone()));
    let pipeline = Pipeline::new(fast_config(), service.clone())
        .with_staging(bucket.clone())
        .with_transcoder(copying_transcoder(dir.join("scratch")))
        .with_echo(false);

    match pipeline.run(&AudioInput::Local(input_path), &out).await {
        Err(PipelineError::Operation(msg)) => assert!(msg.contains("bad sample rate")),
        other => panic!("expected Operation error, got {other:?}"),
    }
    assert!(!out.exists());

    let uri = service.submitted.lock().unwrap()[0].1.clone();
    let staged = RemoteObject::parse(&uri).unwrap();
    assert!(!bucket.exists(&staged).await.unwrap());

    std::fs::remove_dir_all(&dir).unwrap();
}

#[cfg(unix)]
#[tokio::test]
async fn test_save_failure_still_deletes_staged_audio() {
    let dir = scratch("longscribe_pipeline_save_fail");
    let input_path = dir.join("talk.wav");
    std::fs::write(&input_path, b"RIFF fake audio").unwrap();
    let out = dir.join("missing-dir").join("talk.csv");

    let bucket = StagingBucket::new(Arc::new(InMemory::new()), "temp-audio");
    let service = Arc::new(ScriptedService::new(Ok(response())));
    let pipeline = Pipeline::new(fast_config(), service.clone())
        .with_staging(bucket.clone())
        .with_transcoder(copying_transcoder(dir.join("scratch")))
        .with_echo(false);

    match pipeline.run(&AudioInput::Local(input_path), &out).await {
        Err(PipelineError::Output(_)) => {}
        other => panic!("expected Output error, got {other:?}"),
    }

    let uri = service.submitted.lock().unwrap()[0].1.clone();
    let staged = RemoteObject::parse(&uri).unwrap();
    assert!(!bucket.exists(&staged).await.unwrap());

    std::fs::remove_dir_all(&dir).unwrap();
}

#[cfg(unix)]
#[tokio::test]
async fn test_rejected_submission_removes_staged_audio() {
    let dir = scratch("longscribe_pipeline_rejected");
    let input_path = dir.join("memo.wav");
    std::fs::write(&input_path, b"RIFF fake audio").unwrap();
    let out = dir.join("memo.csv");

    let store = Arc::new(InMemory::new());
    let bucket = StagingBucket::new(store.clone(), "temp-audio");
    let service = Arc::new(ScriptedService::new(Ok(response())).rejecting());
    let pipeline = Pipeline::new(fast_config(), service)
        .with_staging(bucket)
        .with_transcoder(copying_transcoder(dir.join("scratch")))
        .with_echo(false);

    match pipeline.run(&AudioInput::Local(input_path), &out).await {
        Err(PipelineError::Asr(AsrError::SubmissionFailed(msg))) => {
            assert!(msg.contains("quota"));
        }
        other => panic!("expected SubmissionFailed, got {other:?}"),
    }
    assert!(!out.exists());

    let listed = store.list_with_delimiter(None).await.unwrap();
    assert!(listed.objects.is_empty());

    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn test_local_input_without_staging_bucket_fails_early() {
    let service = Arc::new(ScriptedService::new(Ok(response())));
    let pipeline = Pipeline::new(fast_config(), service.clone()).with_echo(false);

    let out = std::env::temp_dir().join("longscribe_pipeline_no_bucket.csv");
    let input = AudioInput::Local(PathBuf::from("clip.wav"));
    match pipeline.run(&input, &out).await {
        Err(PipelineError::Storage(_)) => {}
        other => panic!("expected Storage error, got {other:?}"),
    }
    assert!(service.submitted.lock().unwrap().is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn test_failed_cleanup_does_not_fail_the_run() {
    let dir = scratch("longscribe_pipeline_undeletable");
    let input_path = dir.join("lecture.wav");
    std::fs::write(&input_path, b"RIFF fake audio").unwrap();
    let out = dir.join("lecture.csv");

    let store = Arc::new(UndeletableStore::default());
    let bucket = StagingBucket::new(store.clone(), "temp-audio");
    let service = Arc::new(ScriptedService::new(Ok(response())));
    let pipeline = Pipeline::new(fast_config(), service)
        .with_staging(bucket.clone())
        .with_transcoder(copying_transcoder(dir.join("scratch")))
        .with_echo(false);

    let input = AudioInput::Local(input_path);
    let summary = pipeline.run(&input, &out).await.unwrap();
    assert_eq!(summary.rows, 2);

    let csv = std::fs::read_to_string(&out).unwrap();
    assert!(csv.starts_with("timestamp,confidence,transcript\n"));
    assert!(csv.contains("general kenobi"));

    // The delete error is logged, the object stays behind.
    let staged = summary.staged.unwrap();
    assert!(bucket.exists(&staged).await.unwrap());

    std::fs::remove_dir_all(&dir).unwrap();
}

#[cfg(unix)]
#[tokio::test]
async fn test_timeout_leaves_staged_audio_in_place() {
    let dir = scratch("longscribe_pipeline_timeout");
    let input_path = dir.join("podcast.wav");
    std::fs::write(&input_path, b"RIFF fake audio").unwrap();
    let out = dir.join("podcast.csv");

    let mut config = fast_config();
    config.operation.timeout_secs = Some(1);
    let bucket = StagingBucket::new(Arc::new(InMemory::new()), "temp-audio");
    let service = Arc::new(ScriptedService::new(Ok(response())).stalled());
    let pipeline = Pipeline::new(config, service.clone())
        .with_staging(bucket.clone())
        .with_transcoder(copying_transcoder(dir.join("scratch")))
        .with_echo(false);

    match pipeline.run(&AudioInput::Local(input_path), &out).await {
        Err(PipelineError::Asr(AsrError::Timeout(limit))) => {
            assert_eq!(limit, Duration::from_secs(1));
        }
        other => panic!("expected Timeout, got {other:?}"),
    }
    assert!(!out.exists());

    // The job may still be reading the object.
    let uri = service.submitted.lock().unwrap()[0].1.clone();
    let staged = RemoteObject::parse(&uri).unwrap();
    assert!(bucket.exists(&staged).await.unwrap());

    std::fs::remove_dir_all(&dir).unwrap();
}
