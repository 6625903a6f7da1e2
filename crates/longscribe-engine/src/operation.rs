use crate::engine_trait::{OperationFailure, OperationPoll, SpeechService};
use futures::future::BoxFuture;
use longscribe_core::{AsrError, RecognitionResponse};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// google.rpc.Code UNKNOWN, used when polling itself fails.
const POLL_FAILURE_CODE: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationState {
    Pending,
    Running,
    Completed,
    Failed,
}

impl OperationState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OperationState::Completed | OperationState::Failed)
    }
}

pub type OperationOutcome = Result<RecognitionResponse, OperationFailure>;

type DoneCallback = Box<dyn FnOnce(Arc<OperationOutcome>) -> BoxFuture<'static, ()> + Send>;

#[derive(Default)]
struct Callbacks {
    queued: Vec<DoneCallback>,
    /// Set once every queued callback has run; later registrations fire at once.
    fired: Option<Arc<OperationOutcome>>,
    late: Vec<JoinHandle<()>>,
}

fn lock(callbacks: &Mutex<Callbacks>) -> MutexGuard<'_, Callbacks> {
    callbacks
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Handle to a long-running recognition job.
///
/// A driver task polls the service until the job reaches a terminal state,
/// then runs the registered callbacks one after another in registration
/// order. [`wait`](Self::wait) resolves only after those callbacks finished.
pub struct AsyncOperation {
    name: String,
    state_rx: watch::Receiver<OperationState>,
    callbacks: Arc<Mutex<Callbacks>>,
    driver: Option<JoinHandle<Arc<OperationOutcome>>>,
    finished: Option<Arc<OperationOutcome>>,
}

impl AsyncOperation {
    pub fn spawn(service: Arc<dyn SpeechService>, name: String, poll_interval: Duration) -> Self {
        let (state_tx, state_rx) = watch::channel(OperationState::Pending);
        let callbacks = Arc::new(Mutex::new(Callbacks::default()));
        let driver = tokio::spawn(drive(
            service,
            name.clone(),
            poll_interval,
            state_tx,
            Arc::clone(&callbacks),
        ));

        Self {
            name,
            state_rx,
            callbacks,
            driver: Some(driver),
            finished: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> OperationState {
        *self.state_rx.borrow()
    }

    /// Register a callback for the terminal outcome. It runs exactly once.
    pub fn add_done_callback<F, Fut>(&self, callback: F)
    where
        F: FnOnce(Arc<OperationOutcome>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let callback: DoneCallback = Box::new(move |outcome| Box::pin(callback(outcome)));
        let mut callbacks = lock(&self.callbacks);
        match callbacks.fired.clone() {
            Some(outcome) => {
                let handle = tokio::spawn(callback(outcome));
                callbacks.late.push(handle);
            }
            None => callbacks.queued.push(callback),
        }
    }

    /// Wait for the terminal state and for every registered callback.
    ///
    /// A timeout leaves the job and its callbacks running; calling `wait`
    /// again resumes waiting.
    pub async fn wait(
        &mut self,
        timeout: Option<Duration>,
    ) -> Result<Arc<OperationOutcome>, AsrError> {
        let outcome = match (self.finished.clone(), self.driver.as_mut()) {
            (Some(outcome), _) => outcome,
            (None, Some(driver)) => {
                let joined = match timeout {
                    Some(limit) => match tokio::time::timeout(limit, driver).await {
                        Ok(joined) => joined,
                        Err(_) => return Err(AsrError::Timeout(limit)),
                    },
                    None => driver.await,
                };
                let outcome = match joined {
                    Ok(outcome) => outcome,
                    Err(e) => return Err(AsrError::OperationFailed(format!("driver task: {e}"))),
                };
                self.driver = None;
                self.finished = Some(Arc::clone(&outcome));
                outcome
            }
            (None, None) => {
                return Err(AsrError::OperationFailed("driver task is gone".to_string()));
            }
        };

        loop {
            let late = std::mem::take(&mut lock(&self.callbacks).late);
            if late.is_empty() {
                break;
            }
            for handle in late {
                if let Err(e) = handle.await {
                    tracing::error!(operation = %self.name, "done callback panicked: {e}");
                }
            }
        }

        Ok(outcome)
    }

    /// Wait and unwrap the outcome, turning a failed job into an error.
    pub async fn result(
        &mut self,
        timeout: Option<Duration>,
    ) -> Result<RecognitionResponse, AsrError> {
        let outcome = self.wait(timeout).await?;
        match &*outcome {
            Ok(response) => Ok(response.clone()),
            Err(failure) => Err(AsrError::OperationFailed(failure.to_string())),
        }
    }
}

async fn drive(
    service: Arc<dyn SpeechService>,
    name: String,
    poll_interval: Duration,
    state_tx: watch::Sender<OperationState>,
    callbacks: Arc<Mutex<Callbacks>>,
) -> Arc<OperationOutcome> {
    let outcome = loop {
        match service.poll(&name).await {
            Ok(OperationPoll::Running { progress_percent }) => {
                state_tx.send_replace(OperationState::Running);
                tracing::debug!(operation = %name, ?progress_percent, "operation running");
            }
            Ok(OperationPoll::Done(result)) => break result,
            Err(e) => {
                break Err(OperationFailure {
                    code: POLL_FAILURE_CODE,
                    message: e.to_string(),
                })
            }
        }
        tokio::time::sleep(poll_interval).await;
    };

    let terminal = match &outcome {
        Ok(response) => {
            tracing::info!(
                operation = %name,
                segments = response.segments.len(),
                "operation completed"
            );
            OperationState::Completed
        }
        Err(failure) => {
            tracing::error!(operation = %name, "operation failed: {failure}");
            OperationState::Failed
        }
    };
    let outcome = Arc::new(outcome);
    state_tx.send_replace(terminal);

    // Callbacks may be registered while earlier ones run; drain until empty so
    // registration order holds.
    loop {
        let batch = {
            let mut guard = lock(&callbacks);
            if guard.queued.is_empty() {
                guard.fired = Some(Arc::clone(&outcome));
                break;
            }
            std::mem::take(&mut guard.queued)
        };
        for callback in batch {
            callback(Arc::clone(&outcome)).await;
        }
    }

    outcome
}
