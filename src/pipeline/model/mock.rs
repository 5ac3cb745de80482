use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use super::{GenerativeModel, ModelError, ModelRequest};

/// Mock model for testing: returns a canned reply and counts calls.
pub struct MockModel {
    reply: Result<String, (u16, String)>,
    calls: AtomicUsize,
    last_request: Mutex<Option<ModelRequest>>,
}

impl MockModel {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// A model that always answers with an upstream error.
    pub fn failing(status: u16, body: &str) -> Self {
        Self {
            reply: Err((status, body.to_string())),
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<ModelRequest> {
        self.last_request.lock().ok().and_then(|guard| guard.clone())
    }
}

impl GenerativeModel for MockModel {
    fn generate<'a>(&'a self, request: &'a ModelRequest) -> BoxFuture<'a, Result<String, ModelError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(request.clone());
        }
        let reply = match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err((status, body)) => Err(ModelError::Upstream {
                status: *status,
                body: body.clone(),
            }),
        };
        async move { reply }.boxed()
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}
