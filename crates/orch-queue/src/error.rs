use std::fmt;

/// Enqueue failure surfaced to the control plane's `create_run` path (spec
/// §4.1 step 3: on failure, `runs.failure_reason = "queue_publish_failed"`).
#[derive(Debug)]
pub struct EnqueueError {
    pub message: String,
}

impl fmt::Display for EnqueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "enqueue failed: {}", self.message)
    }
}

impl std::error::Error for EnqueueError {}

impl EnqueueError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}
