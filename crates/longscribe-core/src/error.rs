use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("invalid config value: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("failed to start transcoder '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("transcoder exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("transcoder produced no output at {0}")]
    MissingOutput(String),

    #[error("transcoder I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid remote URI: {0}")]
    InvalidUri(String),

    #[error("failed to read local file {path}: {source}")]
    LocalRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("upload failed: {0}")]
    UploadFailed(String),

    #[error("delete failed: {0}")]
    DeleteFailed(String),

    #[error("object lookup failed: {0}")]
    LookupFailed(String),

    #[error("storage backend initialization failed: {0}")]
    InitializationFailed(String),
}

#[derive(Debug, Error)]
pub enum AsrError {
    #[error("speech client initialization failed: {0}")]
    InitializationFailed(String),

    #[error("recognition request rejected: {0}")]
    SubmissionFailed(String),

    #[error("recognition operation failed: {0}")]
    OperationFailed(String),

    #[error("failed to poll operation: {0}")]
    PollFailed(String),

    #[error("invalid response from speech service: {0}")]
    InvalidResponse(String),

    #[error("timed out after {0:?} waiting for operation")]
    Timeout(std::time::Duration),
}

#[derive(Debug, Error)]
pub enum DestinationError {
    #[error("failed to create output file {path}: {source}")]
    Create {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write output: {0}")]
    WriteFailed(String),
}
