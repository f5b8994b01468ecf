//! Scripted [`RpcApi`] used by unit tests

use crate::client::{Product, RpcApi};
use crate::error::{AlicloudError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
enum Reply {
    Ok(Value),
    Err { code: String, message: String },
}

/// One recorded invocation
#[derive(Debug, Clone)]
pub struct Call {
    pub product: Product,
    pub action: String,
    pub params: BTreeMap<String, String>,
}

/// Replies are queued per action. The last queued reply for an action is
/// repeated once the queue is down to it.
#[derive(Default)]
pub struct FakeApi {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn push(&self, action: &str, reply: Reply) {
        self.replies
            .lock()
            .unwrap()
            .entry(action.to_string())
            .or_default()
            .push_back(reply);
    }

    pub fn ok(&self, action: &str, body: Value) -> &Self {
        self.push(action, Reply::Ok(body));
        self
    }

    pub fn err(&self, action: &str, code: &str) -> &Self {
        self.push(
            action,
            Reply::Err {
                code: code.to_string(),
                message: format!("{} returned by fake", code),
            },
        );
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, action: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.action == action)
            .collect()
    }
}

#[async_trait]
impl RpcApi for FakeApi {
    fn region(&self) -> &str {
        "cn-hangzhou"
    }

    async fn invoke(
        &self,
        product: Product,
        action: &str,
        params: BTreeMap<String, String>,
    ) -> Result<Value> {
        self.calls.lock().unwrap().push(Call {
            product,
            action: action.to_string(),
            params,
        });

        let reply = {
            let mut replies = self.replies.lock().unwrap();
            let queue = replies
                .get_mut(action)
                .unwrap_or_else(|| panic!("no reply scripted for {}", action));
            if queue.len() > 1 {
                queue.pop_front().unwrap()
            } else {
                queue.front().cloned().unwrap()
            }
        };

        match reply {
            Reply::Ok(body) => Ok(body),
            Reply::Err { code, message } => Err(AlicloudError::Api {
                action: action.to_string(),
                code,
                message,
                request_id: "fake-request".to_string(),
            }),
        }
    }
}
