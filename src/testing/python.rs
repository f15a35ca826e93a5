//! unittest-backed loader and test units
//!
//! Loading a module imports it in a child interpreter and lists the ids of
//! the tests it defines. Each id then runs in its own `python -m unittest`
//! process so one crashing test cannot take the suite down.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::discovery::ModuleRef;
use super::suite::{ModuleLoader, TestUnit, UnitOutcome, UnitStatus};
use crate::common::{Error, Result};
use crate::setup::installer::RunOptions;
use crate::setup::python::Interpreter;

/// Prefix marking test id lines in the listing output
const ID_MARKER: &str = "suiterun-test-id:";

// Import errors escape as a traceback and a non-zero exit. Anything the
// module prints while loading goes to stderr, only marked ids reach stdout.
const LIST_SNIPPET: &str = r#"
import sys, unittest
out = sys.stdout
sys.stdout = sys.stderr
module = __import__(sys.argv[1], fromlist=['*'])
def walk(suite):
    for test in suite:
        if isinstance(test, unittest.TestSuite):
            for inner in walk(test):
                yield inner
        else:
            yield test
tests = list(walk(unittest.defaultTestLoader.loadTestsFromModule(module)))
sys.stdout = out
for test in tests:
    out.write('suiterun-test-id:' + test.id() + '\n')
out.flush()
"#;

/// Lines of stderr kept when a module fails to import
const LOAD_ERROR_TAIL: usize = 8;

struct Shared {
    interpreter: Interpreter,
    import_root: PathBuf,
    probe_timeout: Option<Duration>,
    test_timeout: Option<Duration>,
}

impl Shared {
    fn options(&self, timeout: Option<Duration>) -> RunOptions {
        let mut python_path = self.import_root.display().to_string();
        if let Ok(existing) = std::env::var("PYTHONPATH") {
            if !existing.is_empty() {
                python_path.push(if cfg!(windows) { ';' } else { ':' });
                python_path.push_str(&existing);
            }
        }
        RunOptions {
            cwd: Some(self.import_root.clone()),
            env: vec![("PYTHONPATH".to_string(), python_path)],
            timeout,
            capture: true,
        }
    }
}

/// Loads test modules through a Python interpreter
#[derive(Clone)]
pub struct PythonLoader {
    shared: Arc<Shared>,
}

impl PythonLoader {
    /// `import_root` is the directory the qualified names are importable from
    pub fn new(
        interpreter: Interpreter,
        import_root: PathBuf,
        probe_timeout: Option<Duration>,
        test_timeout: Option<Duration>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                interpreter,
                import_root,
                probe_timeout,
                test_timeout,
            }),
        }
    }
}

#[async_trait]
impl ModuleLoader for PythonLoader {
    async fn load(&self, module: &ModuleRef) -> Result<Vec<Box<dyn TestUnit>>> {
        let shared = &self.shared;
        let args = vec![
            "-c".to_string(),
            LIST_SNIPPET.to_string(),
            module.qualified_name.clone(),
        ];

        let output = shared
            .interpreter
            .runner()
            .run(
                shared.interpreter.path(),
                &args,
                &shared.options(shared.probe_timeout),
            )
            .await
            .map_err(|e| Error::module_load(&module.qualified_name, e.to_string()))?;

        if !output.success() {
            return Err(Error::module_load(
                &module.qualified_name,
                tail(&output.stderr, LOAD_ERROR_TAIL),
            ));
        }

        Ok(output
            .stdout
            .lines()
            .filter_map(|line| line.trim().strip_prefix(ID_MARKER))
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| {
                Box::new(PythonTestCase {
                    id: id.to_string(),
                    shared: Arc::clone(shared),
                }) as Box<dyn TestUnit>
            })
            .collect())
    }
}

/// A single unittest test method
pub struct PythonTestCase {
    id: String,
    shared: Arc<Shared>,
}

#[async_trait]
impl TestUnit for PythonTestCase {
    fn id(&self) -> &str {
        &self.id
    }

    async fn run(&self) -> UnitOutcome {
        let args = vec![
            "-m".to_string(),
            "unittest".to_string(),
            "-v".to_string(),
            self.id.clone(),
        ];
        let result = self
            .shared
            .interpreter
            .runner()
            .run(
                self.shared.interpreter.path(),
                &args,
                &self.shared.options(self.shared.test_timeout),
            )
            .await;

        match result {
            Ok(output) => classify(&self.id, output.code, &output.stderr),
            Err(Error::Timeout(secs)) => {
                UnitOutcome::with_detail(UnitStatus::Errored, format!("timed out after {secs}s"))
            }
            Err(e) => UnitOutcome::with_detail(UnitStatus::Errored, e.to_string()),
        }
    }
}

/// Map a `python -m unittest -v` exit code and report to an outcome
fn classify(id: &str, code: i32, report: &str) -> UnitOutcome {
    if code == 0 {
        return match skip_reason(id, report) {
            Some(reason) => UnitOutcome::with_detail(UnitStatus::Skipped, reason),
            None => UnitOutcome::passed(),
        };
    }

    let summary = report
        .lines()
        .rev()
        .find(|line| line.starts_with("FAILED"))
        .unwrap_or("");
    let status = if summary.contains("errors=") || summary.is_empty() {
        UnitStatus::Errored
    } else {
        UnitStatus::Failed
    };
    UnitOutcome::with_detail(status, report.trim_end())
}

/// Skip reason from the verbose result line of `id` itself.
///
/// The line starts with `<method> (`; a docstring pushes the result onto
/// the following line.
fn skip_reason(id: &str, report: &str) -> Option<String> {
    let method = id.rsplit('.').next().unwrap_or(id);
    let header = format!("{method} (");
    let mut lines = report.lines().skip_while(|line| !line.starts_with(&header));
    let first = lines.next()?;
    let result = if first.contains(" ... ") {
        first
    } else {
        lines.next()?
    };
    let (_, verdict) = result.split_once(" ... ")?;
    let reason = verdict.strip_prefix("skipped")?;
    Some(reason.trim().trim_matches(|c| c == '\'' || c == '"').to_string())
}

fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.trim_end().lines().collect();
    all[all.len().saturating_sub(lines)..].join("\n")
}
