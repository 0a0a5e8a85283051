//! Scripted [`ProcessExecutor`] for tests.
//!
//! Rules are matched in registration order against the request's printable
//! command line. Requests no rule matches fail to spawn, like a missing
//! binary would.

use crate::executor::{ProcessExecutor, ProcessOutput, ProcessRequest};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::io;
use std::sync::Arc;

/// What a matched request produces.
#[derive(Debug, Clone)]
pub enum ScriptedResponse {
    Output(ProcessOutput),
    /// The process cannot be started.
    SpawnError(String),
    /// Runs until its timeout.
    Hang,
}

type Matcher = Arc<dyn Fn(&ProcessRequest) -> bool + Send + Sync>;

#[derive(Clone)]
struct Rule {
    matcher: Matcher,
    response: ScriptedResponse,
    remaining: Option<usize>,
}

#[derive(Default)]
pub struct ScriptedExecutor {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<ProcessRequest>>,
}

impl ScriptedExecutor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Answer every request matching `matcher` with `response`.
    pub fn on<F>(&self, matcher: F, response: ScriptedResponse) -> &Self
    where
        F: Fn(&ProcessRequest) -> bool + Send + Sync + 'static,
    {
        self.push(Arc::new(matcher), response, None)
    }

    /// Answer requests whose command line contains `needle`.
    pub fn on_contains(&self, needle: &str, response: ScriptedResponse) -> &Self {
        let needle = needle.to_string();
        self.push(
            Arc::new(move |request: &ProcessRequest| request.command_line().contains(&needle)),
            response,
            None,
        )
    }

    /// Like [`Self::on_contains`], but only for the next `times` matches.
    pub fn on_contains_times(&self, needle: &str, times: usize, response: ScriptedResponse) -> &Self {
        let needle = needle.to_string();
        self.push(
            Arc::new(move |request: &ProcessRequest| request.command_line().contains(&needle)),
            response,
            Some(times),
        )
    }

    /// Shorthand for a successful run printing `stdout`.
    pub fn stdout(&self, needle: &str, stdout: &str) -> &Self {
        self.on_contains(needle, ScriptedResponse::Output(ProcessOutput::success(stdout)))
    }

    fn push(&self, matcher: Matcher, response: ScriptedResponse, remaining: Option<usize>) -> &Self {
        self.rules.lock().push(Rule {
            matcher,
            response,
            remaining,
        });
        self
    }

    pub fn calls(&self) -> Vec<ProcessRequest> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Number of recorded requests whose command line contains `needle`.
    pub fn count_containing(&self, needle: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|request| request.command_line().contains(needle))
            .count()
    }

    fn respond(&self, request: &ProcessRequest) -> Option<ScriptedResponse> {
        let mut rules = self.rules.lock();
        let rule = rules.iter_mut().find(|rule| {
            rule.remaining.map_or(true, |left| left > 0) && (rule.matcher)(request)
        })?;
        if let Some(left) = rule.remaining.as_mut() {
            *left -= 1;
        }
        Some(rule.response.clone())
    }
}

#[async_trait]
impl ProcessExecutor for ScriptedExecutor {
    async fn run(&self, request: ProcessRequest) -> io::Result<ProcessOutput> {
        self.calls.lock().push(request.clone());
        match self.respond(&request) {
            Some(ScriptedResponse::Output(output)) => Ok(output),
            Some(ScriptedResponse::SpawnError(message)) => {
                Err(io::Error::new(io::ErrorKind::NotFound, message))
            }
            Some(ScriptedResponse::Hang) => {
                tokio::time::sleep(request.timeout).await;
                Ok(ProcessOutput::timed_out())
            }
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no scripted response for '{}'", request.command_line()),
            )),
        }
    }
}
