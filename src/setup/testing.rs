//! Recording subprocess fake for unit tests

use super::installer::{CommandOutput, CommandRunner, RunOptions};
use super::python::IMPORT_SNIPPET;
use crate::common::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// One recorded invocation
#[derive(Debug, Clone)]
pub struct Call {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub capture: bool,
    /// Whether `args[0]` named an existing file while the call ran
    pub first_arg_existed: bool,
}

struct Rule {
    needles: Vec<String>,
    code: i32,
    stdout: String,
}

/// Records every call; answers from rules, exit 0 otherwise
#[derive(Default)]
pub struct RecordingRunner {
    rules: Vec<Rule>,
    calls: Mutex<Vec<Call>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    fn rule(mut self, needles: &[&str], code: i32, stdout: &str) -> Self {
        self.rules.push(Rule {
            needles: needles.iter().map(|s| s.to_string()).collect(),
            code,
            stdout: stdout.to_string(),
        });
        self
    }

    /// Calls whose args contain `needle` print `stdout`
    pub fn stdout_for(self, needle: &str, stdout: &str) -> Self {
        self.rule(&[needle], 0, stdout)
    }

    /// Calls whose args contain `needle` exit with `code`
    pub fn exit_for(self, needle: &str, code: i32) -> Self {
        self.rule(&[needle], code, "")
    }

    /// Import probes for `module` fail
    pub fn missing_module(self, module: &str) -> Self {
        self.rule(&[IMPORT_SNIPPET, module], 1, "")
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(
        &self,
        program: &Path,
        args: &[String],
        opts: &RunOptions,
    ) -> Result<CommandOutput> {
        let call = Call {
            program: program.to_path_buf(),
            args: args.to_vec(),
            capture: opts.capture,
            first_arg_existed: args.first().is_some_and(|a| Path::new(a).is_file()),
        };
        self.calls.lock().unwrap().push(call);

        let rule = self
            .rules
            .iter()
            .find(|rule| rule.needles.iter().all(|n| args.contains(n)));
        Ok(match rule {
            Some(rule) => CommandOutput {
                code: rule.code,
                stdout: rule.stdout.clone(),
                stderr: String::new(),
            },
            None => CommandOutput::default(),
        })
    }
}

/// Serve `body` to the first HTTP request on a local port; returns its URL
pub async fn serve_once(body: &'static str) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
        }
    });
    format!("http://{}/get-pip.py", addr)
}
