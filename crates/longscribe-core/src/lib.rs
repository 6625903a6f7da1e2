pub mod config;
pub mod error;
pub mod naming;
pub mod types;

pub use config::AppConfig;
pub use error::{AsrError, ConfigError, DestinationError, StorageError, TranscodeError};
pub use naming::object_name;
pub use types::{
    Alternative, AudioEncoding, AudioInput, Offset, RecognitionMetadata, RecognitionRequest,
    RecognitionResponse, RemoteObject, Segment, WordInfo,
};
