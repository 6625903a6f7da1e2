use crate::engine_trait::{OperationFailure, OperationPoll, SpeechService};
use async_trait::async_trait;
use longscribe_core::{
    Alternative, AsrError, Offset, RecognitionRequest, RecognitionResponse, Segment, WordInfo,
};
use serde::{Deserialize, Serialize};

const API_VERSION: &str = "v1p1beta1";

/// Speech-to-Text over the REST API, authenticated with an OAuth bearer token.
pub struct GoogleSpeechService {
    http: reqwest::Client,
    endpoint: String,
    access_token: String,
}

impl GoogleSpeechService {
    pub fn new(endpoint: &str, access_token: &str) -> Result<Self, AsrError> {
        if access_token.is_empty() {
            return Err(AsrError::InitializationFailed(
                "missing access token".to_string(),
            ));
        }
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| AsrError::InitializationFailed(e.to_string()))?;
        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
        })
    }

    fn recognize_url(&self) -> String {
        let endpoint = &self.endpoint;
        format!("{endpoint}/{API_VERSION}/speech:longrunningrecognize")
    }

    fn operation_url(&self, name: &str) -> String {
        let endpoint = &self.endpoint;
        format!("{endpoint}/{API_VERSION}/operations/{name}")
    }
}

#[async_trait]
impl SpeechService for GoogleSpeechService {
    fn name(&self) -> &str {
        "google"
    }

    async fn submit(
        &self,
        request: &RecognitionRequest,
        audio_uri: &str,
    ) -> Result<String, AsrError> {
        let body = RecognizeBody::new(request, audio_uri);
        let url = self.recognize_url();
        tracing::trace!("POST {url}");

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AsrError::SubmissionFailed(e.to_string()))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| AsrError::SubmissionFailed(e.to_string()))?;
        if !status.is_success() {
            return Err(AsrError::SubmissionFailed(format!(
                "status={status}: {}",
                error_message(&text)
            )));
        }

        let op: WireOperation = serde_json::from_str(&text)
            .map_err(|e| AsrError::InvalidResponse(format!("operation: {e}")))?;
        if op.name.is_empty() {
            return Err(AsrError::InvalidResponse(
                "operation has no name".to_string(),
            ));
        }
        Ok(op.name)
    }

    async fn poll(&self, operation: &str) -> Result<OperationPoll, AsrError> {
        let url = self.operation_url(operation);
        tracing::trace!("GET {url}");

        let resp = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| AsrError::PollFailed(e.to_string()))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| AsrError::PollFailed(e.to_string()))?;
        if !status.is_success() {
            return Err(AsrError::PollFailed(format!(
                "status={status}: {}",
                error_message(&text)
            )));
        }

        parse_operation(&text)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RecognizeBody<'a> {
    config: WireConfig<'a>,
    audio: WireAudio<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireConfig<'a> {
    encoding: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sample_rate_hertz: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    audio_channel_count: Option<u16>,
    language_code: &'a str,
    enable_automatic_punctuation: bool,
    enable_word_time_offsets: bool,
    metadata: WireMetadata<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireMetadata<'a> {
    interaction_type: &'a str,
    microphone_distance: &'a str,
    recording_device_type: &'a str,
}

#[derive(Serialize)]
struct WireAudio<'a> {
    uri: &'a str,
}

impl<'a> RecognizeBody<'a> {
    fn new(request: &'a RecognitionRequest, audio_uri: &'a str) -> Self {
        Self {
            config: WireConfig {
                encoding: request.encoding.as_api_str(),
                sample_rate_hertz: request.sample_rate_hertz,
                audio_channel_count: request.audio_channel_count,
                language_code: &request.language_code,
                enable_automatic_punctuation: request.enable_automatic_punctuation,
                enable_word_time_offsets: request.enable_word_time_offsets,
                metadata: WireMetadata {
                    interaction_type: &request.metadata.interaction_type,
                    microphone_distance: &request.metadata.microphone_distance,
                    recording_device_type: &request.metadata.recording_device_type,
                },
            },
            audio: WireAudio { uri: audio_uri },
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct WireOperation {
    name: String,
    done: bool,
    metadata: Option<WireProgress>,
    response: Option<WireResponse>,
    error: Option<WireStatus>,
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct WireProgress {
    progress_percent: Option<u32>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct WireStatus {
    code: i32,
    message: String,
}

#[derive(Deserialize)]
struct WireErrorBody {
    error: WireStatus,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct WireResponse {
    results: Vec<WireResult>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct WireResult {
    alternatives: Vec<WireAlternative>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct WireAlternative {
    transcript: String,
    confidence: f32,
    words: Vec<WireWord>,
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct WireWord {
    word: String,
    start_time: Option<String>,
    end_time: Option<String>,
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<WireErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

/// Parse a protobuf JSON duration such as `"1.300s"`. A negative duration
/// carries its sign on both fields.
pub fn parse_duration(s: &str) -> Result<Offset, AsrError> {
    let invalid = || AsrError::InvalidResponse(format!("bad duration '{s}'"));
    let body = s.strip_suffix('s').ok_or_else(invalid)?;
    let (whole, frac) = body.split_once('.').unwrap_or((body, ""));

    let seconds: i64 = whole.parse().map_err(|_| invalid())?;
    if frac.len() > 9 || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let mut nanos: i32 = if frac.is_empty() {
        0
    } else {
        format!("{frac:0<9}").parse().map_err(|_| invalid())?
    };
    if whole.starts_with('-') {
        nanos = -nanos;
    }

    Ok(Offset { seconds, nanos })
}

fn parse_offset(value: Option<&str>) -> Result<Offset, AsrError> {
    value.map(parse_duration).unwrap_or(Ok(Offset::default()))
}

fn parse_operation(body: &str) -> Result<OperationPoll, AsrError> {
    let op: WireOperation = serde_json::from_str(body)
        .map_err(|e| AsrError::InvalidResponse(format!("operation: {e}")))?;

    if !op.done {
        return Ok(OperationPoll::Running {
            progress_percent: op.metadata.and_then(|m| m.progress_percent),
        });
    }

    if let Some(status) = op.error {
        return Ok(OperationPoll::Done(Err(OperationFailure {
            code: status.code,
            message: status.message,
        })));
    }

    let results = op.response.unwrap_or_default().results;
    let mut segments = Vec::with_capacity(results.len());
    for result in results {
        let mut alternatives = Vec::with_capacity(result.alternatives.len());
        for alt in result.alternatives {
            let words = alt
                .words
                .into_iter()
                .map(|w| {
                    Ok(WordInfo {
                        start_time: parse_offset(w.start_time.as_deref())?,
                        end_time: parse_offset(w.end_time.as_deref())?,
                        word: w.word,
                    })
                })
                .collect::<Result<Vec<_>, AsrError>>()?;
            alternatives.push(Alternative {
                transcript: alt.transcript,
                confidence: alt.confidence,
                words,
            });
        }
        segments.push(Segment { alternatives });
    }

    Ok(OperationPoll::Done(Ok(RecognitionResponse { segments })))
}
