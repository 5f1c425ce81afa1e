//! In-memory gateway that replays canned responses in tests.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

use super::ProviderGateway;
use crate::error::GatewayError;

enum Reply {
    Body(Value),
    Failure(String),
}

/// Responses are keyed by `"service operation arg..."`; unknown keys fail
/// like a CLI access-denied error.
pub(crate) struct ScriptedGateway {
    replies: HashMap<String, Reply>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedGateway {
    pub(crate) fn new() -> Self {
        Self {
            replies: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn respond(mut self, key: &str, body: Value) -> Self {
        self.replies.insert(key.to_string(), Reply::Body(body));
        self
    }

    pub(crate) fn fail(mut self, key: &str, message: &str) -> Self {
        self.replies
            .insert(key.to_string(), Reply::Failure(message.to_string()));
        self
    }

    /// Every call key, in the order calls were issued
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProviderGateway for ScriptedGateway {
    fn region(&self) -> &str {
        "us-test-1"
    }

    async fn call(
        &self,
        service: &str,
        operation: &str,
        args: &[String],
    ) -> Result<Value, GatewayError> {
        let mut key = format!("{} {}", service, operation);
        for arg in args {
            key.push(' ');
            key.push_str(arg);
        }
        self.calls.lock().unwrap().push(key.clone());

        match self.replies.get(&key) {
            Some(Reply::Body(body)) => Ok(body.clone()),
            Some(Reply::Failure(message)) => Err(GatewayError::Transport {
                status: "exit status: 254".to_string(),
                output: message.clone(),
            }),
            None => Err(GatewayError::Transport {
                status: "exit status: 255".to_string(),
                output: format!("no scripted response for `{}`", key),
            }),
        }
    }
}
