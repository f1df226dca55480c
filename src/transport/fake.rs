//! Scripted in-memory transport (testing only).

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{FetchRequest, FetchResponse, Method, Transport};
use crate::error::TransportError;

type Scripted = Result<String, u16>;

/// Replies from per-URL queues; the last queued reply repeats. URLs with no
/// script answer 404. Every call is logged.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<HashMap<String, VecDeque<Scripted>>>,
    calls: Mutex<Vec<(Method, String)>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, url: &str, body: &str) -> Self {
        self.push(url, Ok(body.to_string()))
    }

    pub fn fail(self, url: &str, status: u16) -> Self {
        self.push(url, Err(status))
    }

    fn push(self, url: &str, reply: Scripted) -> Self {
        self.replies
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    pub fn calls(&self) -> Vec<(Method, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, method: Method, prefix: &str) -> usize {
        self.calls()
            .iter()
            .filter(|(m, u)| *m == method && u.starts_with(prefix))
            .count()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn fetch(&self, url: &str, request: FetchRequest) -> Result<FetchResponse, TransportError> {
        self.calls.lock().unwrap().push((request.method, url.to_string()));

        let reply = {
            let mut replies = self.replies.lock().unwrap();
            match replies.get_mut(url) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };

        match reply {
            Some(Ok(body)) => Ok(FetchResponse {
                status: 200,
                body,
                headers: HashMap::new(),
            }),
            Some(Err(status)) => Err(TransportError::Status {
                url: url.to_string(),
                status,
            }),
            None => Err(TransportError::Status {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}
