use crate::error::Result;
use crate::models::{Request, Response};

/// Transport sends one request and returns the decoded response.
///
/// Implementations own connection handling, authentication and any retry
/// policy. A non-2xx status is not an error at this level; only failing to
/// obtain a response at all is.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: Request) -> Result<Response>;
}

#[cfg(any(test, feature = "test-util"))]
pub use scripted::ScriptedTransport;

#[cfg(any(test, feature = "test-util"))]
mod scripted {
    use std::collections::VecDeque;
    use std::sync::{Mutex, PoisonError};

    use serde_json::Value;

    use super::Transport;
    use crate::error::{Error, Result};
    use crate::models::{Request, Response};

    /// Replays queued responses in order and records every request sent
    #[derive(Debug, Default)]
    pub struct ScriptedTransport {
        responses: Mutex<VecDeque<Response>>,
        requests: Mutex<Vec<Request>>,
    }

    impl ScriptedTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue a response built from a status and body
        pub fn push(&self, status: u16, body: Value) -> &Self {
            self.responses
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push_back(Response::new(status, body));
            self
        }

        /// Requests sent so far, oldest first
        pub fn requests(&self) -> Vec<Request> {
            self.requests
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }

        pub fn request_count(&self) -> usize {
            self.requests
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .len()
        }

        pub fn remaining(&self) -> usize {
            self.responses
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .len()
        }
    }

    #[async_trait::async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, request: Request) -> Result<Response> {
            let label = format!("{} {}", request.method, request.endpoint);
            self.requests
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(request);
            self.responses
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front()
                .ok_or_else(|| Error::transport(format!("no scripted response for {}", label)))
        }
    }
}
