//! Test utilities
//!
//! Scripted doubles for the process and download seams plus proptest
//! generators.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Mutex;

use crate::error::{DownloadError, ProcessError};
use crate::infra::download::Fetcher;
use crate::infra::process::{CommandOutput, CommandRunner, Invocation};

type Effect = Box<dyn Fn(&Invocation) + Send + Sync>;

enum Reply {
    Output(Vec<String>),
    Fail,
    Effect(Effect),
}

/// `CommandRunner` that records invocations and replays scripted replies
///
/// Replies are matched by command prefix, first rule wins. Unmatched
/// commands succeed with empty output.
#[derive(Default)]
pub struct RecordingRunner {
    rules: Vec<(String, Reply)>,
    calls: Mutex<Vec<Invocation>>,
    counters: Mutex<BTreeMap<usize, usize>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with `output` to commands starting with `prefix`
    pub fn respond(self, prefix: &str, output: &str) -> Self {
        self.respond_seq(prefix, &[output])
    }

    /// Reply with successive outputs; the last one repeats
    pub fn respond_seq(mut self, prefix: &str, outputs: &[&str]) -> Self {
        let outputs = outputs.iter().map(|s| (*s).to_string()).collect();
        self.rules.push((prefix.to_string(), Reply::Output(outputs)));
        self
    }

    /// Exit with status 1 for commands starting with `prefix`
    pub fn fail_on(mut self, prefix: &str) -> Self {
        self.rules.push((prefix.to_string(), Reply::Fail));
        self
    }

    /// Run a side effect, then succeed
    pub fn on(mut self, prefix: &str, effect: impl Fn(&Invocation) + Send + Sync + 'static) -> Self {
        self.rules
            .push((prefix.to_string(), Reply::Effect(Box::new(effect))));
        self
    }

    /// Every invocation so far
    pub fn invocations(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    /// Command lines so far
    pub fn commands(&self) -> Vec<String> {
        self.invocations().into_iter().map(|i| i.command).collect()
    }

    /// Forget recorded invocations
    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput, ProcessError> {
        self.calls.lock().unwrap().push(invocation.clone());

        let rule = self
            .rules
            .iter()
            .enumerate()
            .find(|(_, (prefix, _))| invocation.command.starts_with(prefix.as_str()));

        let Some((index, (_, reply))) = rule else {
            return Ok(CommandOutput {
                code: Some(0),
                output: String::new(),
            });
        };

        match reply {
            Reply::Output(outputs) => {
                let mut counters = self.counters.lock().unwrap();
                let seen = counters.entry(index).or_default();
                let output = outputs[(*seen).min(outputs.len() - 1)].clone();
                *seen += 1;
                Ok(CommandOutput {
                    code: Some(0),
                    output,
                })
            }
            Reply::Fail => Ok(CommandOutput {
                code: Some(1),
                output: String::new(),
            }),
            Reply::Effect(effect) => {
                effect(invocation);
                Ok(CommandOutput {
                    code: Some(0),
                    output: String::new(),
                })
            }
        }
    }
}

/// `Fetcher` serving canned bodies
#[derive(Default)]
pub struct MockFetcher {
    bodies: BTreeMap<String, Vec<u8>>,
    unreachable: BTreeSet<String>,
    fetched: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` at `url`
    pub fn serve(mut self, url: &str, body: &[u8]) -> Self {
        self.bodies.insert(url.to_string(), body.to_vec());
        self
    }

    /// Make probes of `url` fail while still serving it
    pub fn unreachable(mut self, url: &str) -> Self {
        self.unreachable.insert(url.to_string());
        self
    }

    /// URLs fetched so far
    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

impl Fetcher for MockFetcher {
    fn probe(&self, url: &str) -> bool {
        self.bodies.contains_key(url) && !self.unreachable.contains(url)
    }

    fn fetch(&self, url: &str, dest: &Path) -> Result<(), DownloadError> {
        self.fetched.lock().unwrap().push(url.to_string());
        let body = self
            .bodies
            .get(url)
            .ok_or_else(|| DownloadError::NetworkError {
                url: url.to_string(),
                error: "HTTP 404".to_string(),
            })?;
        std::fs::write(dest, body).map_err(|e| DownloadError::IoError {
            path: dest.to_path_buf(),
            error: e.to_string(),
        })
    }
}

pub mod generators {
    use proptest::prelude::*;

    /// Catalog node name
    pub fn node_name() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9_]{0,20}"
    }

    /// Archive URL
    pub fn archive_url() -> impl Strategy<Value = String> {
        (
            prop_oneof!["https", "http", "ftp"],
            "[a-z]{3,10}",
            "[a-z]{2,5}",
            "[a-z0-9-]{1,20}",
            prop_oneof![".tar.gz", ".tar.xz", ".tar.bz2", ".zip"],
        )
            .prop_map(|(scheme, domain, tld, name, ext)| {
                format!("{scheme}://{domain}.{tld}/{name}{ext}")
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runner_replays_in_order() {
        let runner = RecordingRunner::new().respond_seq("id", &["1", "2"]);
        let inv = Invocation::new("id", "/");
        assert_eq!(runner.run(&inv).unwrap().output, "1");
        assert_eq!(runner.run(&inv).unwrap().output, "2");
        assert_eq!(runner.run(&inv).unwrap().output, "2");
        assert_eq!(runner.commands().len(), 3);
    }

    #[test]
    fn test_runner_failure_is_exit_status() {
        let runner = RecordingRunner::new().fail_on("make");
        let out = runner.run(&Invocation::new("make -j 4", "/")).unwrap();
        assert!(!out.success());
        assert!(runner.run(&Invocation::new("true", "/")).unwrap().success());
    }
}
