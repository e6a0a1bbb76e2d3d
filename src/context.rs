use std::future::Future;
use std::time::Duration;
use uuid::Uuid;

use crate::collaborators::LookupError;

/// Default bound on a single collaborator call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(3);

// ============================================================================
// Request Context - per-request data passed explicitly into every call
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct RequestContext {
    pub correlation_id: Uuid,
    pub timeout: Duration,
}

impl RequestContext {
    pub fn new(timeout: Duration) -> Self {
        Self {
            correlation_id: Uuid::new_v4(),
            timeout,
        }
    }

    pub fn with_correlation(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = correlation_id;
        self
    }

    /// Run a collaborator call under this request's timeout.
    ///
    /// An elapsed timeout is reported as `LookupError::Timeout`. The inner
    /// future is dropped on timeout, which cancels the call.
    pub async fn bounded<T, F>(&self, call: F) -> Result<T, LookupError>
    where
        F: Future<Output = Result<T, LookupError>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(LookupError::Timeout(self.timeout)),
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_TIMEOUT)
    }
}
