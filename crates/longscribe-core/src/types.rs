use crate::error::StorageError;
use std::fmt;
use std::path::PathBuf;

/// Audio encodings understood by the recognition service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioEncoding {
    Flac,
    Linear16,
    OggOpus,
}

impl AudioEncoding {
    pub fn as_api_str(&self) -> &'static str {
        match self {
            AudioEncoding::Flac => "FLAC",
            AudioEncoding::Linear16 => "LINEAR16",
            AudioEncoding::OggOpus => "OGG_OPUS",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "FLAC" => Some(AudioEncoding::Flac),
            "LINEAR16" => Some(AudioEncoding::Linear16),
            "OGG_OPUS" => Some(AudioEncoding::OggOpus),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionMetadata {
    pub interaction_type: String,
    pub microphone_distance: String,
    pub recording_device_type: String,
}

/// One recognition job's parameters. Built once per run.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionRequest {
    pub encoding: AudioEncoding,
    pub sample_rate_hertz: Option<u32>,
    pub audio_channel_count: Option<u16>,
    pub language_code: String,
    pub metadata: RecognitionMetadata,
    pub enable_automatic_punctuation: bool,
    pub enable_word_time_offsets: bool,
}

/// A point in the audio as whole seconds plus a nanosecond remainder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Offset {
    pub seconds: i64,
    pub nanos: i32,
}

impl Offset {
    pub fn as_secs_f64(&self) -> f64 {
        self.seconds as f64 + 1e-9 * self.nanos as f64
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WordInfo {
    pub word: String,
    pub start_time: Offset,
    pub end_time: Offset,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Alternative {
    pub transcript: String,
    pub confidence: f32,
    pub words: Vec<WordInfo>,
}

/// One consecutive portion of the recognized audio. Alternatives are ranked,
/// best first.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub alternatives: Vec<Alternative>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecognitionResponse {
    pub segments: Vec<Segment>,
}

/// An object in the staging bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObject {
    pub bucket: String,
    pub name: String,
}

impl RemoteObject {
    pub const SCHEME: &'static str = "gs://";

    pub fn uri(&self) -> String {
        format!("{}{}/{}", Self::SCHEME, self.bucket, self.name)
    }

    /// Split `gs://bucket/path/to/object`. Returns `None` unless both the
    /// bucket and the object name are non-empty.
    pub fn parse(uri: &str) -> Option<Self> {
        let rest = uri.strip_prefix(Self::SCHEME)?;
        let (bucket, name) = rest.split_once('/')?;
        if bucket.is_empty() || name.is_empty() {
            return None;
        }
        Some(Self {
            bucket: bucket.to_string(),
            name: name.to_string(),
        })
    }
}

impl fmt::Display for RemoteObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.uri())
    }
}

/// What the user asked to transcribe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioInput {
    Local(PathBuf),
    Remote(RemoteObject),
}

impl AudioInput {
    pub fn from_arg(arg: &str) -> Result<Self, StorageError> {
        if arg.starts_with(RemoteObject::SCHEME) {
            RemoteObject::parse(arg)
                .map(AudioInput::Remote)
                .ok_or_else(|| StorageError::InvalidUri(arg.to_string()))
        } else {
            Ok(AudioInput::Local(PathBuf::from(arg)))
        }
    }

    /// Default CSV location: the input with its extension swapped for `.csv`.
    /// Remote inputs land in the working directory under the object's file name.
    pub fn default_output_path(&self) -> PathBuf {
        match self {
            AudioInput::Local(path) => path.with_extension("csv"),
            AudioInput::Remote(object) => {
                let file_name = object.name.rsplit('/').next().unwrap_or(&object.name);
                PathBuf::from(file_name).with_extension("csv")
            }
        }
    }
}
