//! Scripted transport for unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::transport::{HttpRequest, HttpResponse, HttpTransport, TransportError};
use crate::clock::Clock;

type Scripted = Result<HttpResponse, TransportError>;

/// Routes requests by URL suffix to queued responses.
///
/// A route's last queued response is sticky: it keeps being returned once
/// the earlier ones are consumed.
pub(crate) struct MockTransport {
    routes: Mutex<Vec<(String, VecDeque<Scripted>)>>,
    calls: Mutex<Vec<(HttpRequest, i64)>>,
    clock: Option<Arc<dyn Clock>>,
    hang: Option<Duration>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            routes: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            clock: None,
            hang: None,
        }
    }

    /// Stamp each call with the clock's time.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Hold every request for `duration` of real time before answering.
    pub fn hanging(mut self, duration: Duration) -> Self {
        self.hang = Some(duration);
        self
    }

    pub fn on(&self, suffix: &str, response: Scripted) -> &Self {
        let mut routes = self.routes.lock().unwrap();
        match routes.iter_mut().find(|(s, _)| s == suffix) {
            Some((_, queue)) => queue.push_back(response),
            None => routes.push((suffix.to_string(), VecDeque::from([response]))),
        }
        self
    }

    pub fn on_json(&self, suffix: &str, body: &str) -> &Self {
        self.on(suffix, Ok(HttpResponse::ok(body)))
    }

    pub fn calls(&self) -> Vec<HttpRequest> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(r, _)| r.clone())
            .collect()
    }

    pub fn call_times(&self) -> Vec<i64> {
        self.calls.lock().unwrap().iter().map(|(_, t)| *t).collect()
    }

    pub fn count(&self, suffix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(r, _)| r.url.ends_with(suffix))
            .count()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn get(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let at = self.clock.as_ref().map(|c| c.now_millis()).unwrap_or(0);
        self.calls.lock().unwrap().push((request.clone(), at));

        if let Some(hang) = self.hang {
            tokio::time::sleep(hang).await;
        }

        let mut routes = self.routes.lock().unwrap();
        let route = routes
            .iter_mut()
            .filter(|(suffix, _)| request.url.ends_with(suffix.as_str()))
            .max_by_key(|(suffix, _)| suffix.len());

        match route {
            Some((_, queue)) => {
                if queue.len() > 1 {
                    queue.pop_front().unwrap()
                } else {
                    queue
                        .front()
                        .cloned()
                        .unwrap_or(Err(TransportError::Connection("empty route".to_string())))
                }
            }
            None => Err(TransportError::Connection(format!(
                "no route for {}",
                request.url
            ))),
        }
    }
}
