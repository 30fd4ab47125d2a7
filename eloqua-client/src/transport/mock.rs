//! In-crate mock transport: records invocations, replays queued responses.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{EloquaError, Result};
use crate::transport::{Endpoint, Transport};

#[derive(Debug, Clone)]
pub(crate) struct RecordedCall {
    pub endpoint: Endpoint,
    pub operation: String,
    pub body: Option<String>,
}

#[derive(Default)]
pub(crate) struct MockTransport {
    responses: Mutex<VecDeque<Result<Value>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, response: Value) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    pub fn push_error(&self, error: EloquaError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_call(&self) -> RecordedCall {
        self.calls
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no calls recorded")
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn invoke(
        &self,
        endpoint: Endpoint,
        operation: &str,
        body: Option<String>,
    ) -> Result<Value> {
        self.calls.lock().unwrap().push(RecordedCall {
            endpoint,
            operation: operation.to_string(),
            body,
        });
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(EloquaError::Fault("no queued mock response".to_string())))
    }
}
