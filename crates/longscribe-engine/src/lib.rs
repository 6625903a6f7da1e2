pub mod engine_trait;
pub mod google;
pub mod operation;
pub mod submitter;

pub use engine_trait::{OperationFailure, OperationPoll, SpeechService};
pub use google::GoogleSpeechService;
pub use operation::{AsyncOperation, OperationOutcome, OperationState};
pub use submitter::submit;
