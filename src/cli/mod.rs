//! CLI front-end
//!
//! Two terminal paths: install the test dependencies, or check that they
//! are importable and run the suite. The install path never runs tests.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use crate::commands::Options;
use crate::common::config::{as_timeout, Config};
use crate::common::{paths, Error, Result};
use crate::setup::installer::{CommandRunner, SystemRunner};
use crate::setup::python::Interpreter;
use crate::setup::requirements::{Requirement, Requirements};
use crate::setup::{first_missing, DependencyResolver, ModuleProbe};
use crate::testing::python::PythonLoader;
use crate::testing::{build_suite, run_with_output, DiscoveryRules, ModuleLoader, RunResult};

/// Everything the test path needs besides its collaborators
#[derive(Debug, Clone)]
pub struct TestPlan {
    pub dir: PathBuf,
    pub rules: DiscoveryRules,
    pub namespace: String,
    pub verbosity: u8,
    /// Command suggested when a dependency is missing
    pub install_hint: String,
}

/// Parse-time options layered over the configuration file
fn apply_overrides(config: &mut Config, options: &Options) {
    if let Some(python) = &options.python {
        config.python.interpreter = Some(python.clone());
    }
    if let Some(namespace) = &options.namespace {
        config.discovery.namespace = Some(namespace.clone());
    }
    if let Some(verbosity) = options.verbosity {
        config.runner.verbosity = verbosity;
    }
    if options.insecure_bootstrap {
        config.installer.verify_tls = false;
    }
}

/// Run the front-end and return the process exit code
pub async fn dispatch(options: Options) -> Result<i32> {
    let mut config = Config::load(options.config.as_deref())?;
    apply_overrides(&mut config, &options);

    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner);
    let path = Interpreter::locate(config.python.interpreter.as_deref())?;
    let interpreter = Interpreter::new(path, runner, as_timeout(config.timeouts.probe_secs));

    let version = interpreter.version().await?;
    tracing::info!(interpreter = %interpreter.path().display(), %version, "using interpreter");
    let requirements = Requirements::for_version(version, &config.installer.extra_requirements)?;

    if options.install_deps {
        let resolver = DependencyResolver::new(interpreter, &config.installer, &config.timeouts);
        install_deps(&resolver, requirements.as_slice()).await?;
        return Ok(0);
    }

    let dir = std::fs::canonicalize(&options.dir).map_err(|source| Error::Discovery {
        path: options.dir.clone(),
        source,
    })?;
    let (import_root, derived) = paths::package_layout(&dir);
    let namespace = config.discovery.namespace.clone().unwrap_or(derived);
    tracing::debug!(dir = %dir.display(), import_root = %import_root.display(), %namespace, "test layout");

    let loader = PythonLoader::new(
        interpreter.clone(),
        import_root,
        as_timeout(config.timeouts.probe_secs),
        as_timeout(config.timeouts.test_secs),
    );
    let plan = TestPlan {
        dir,
        rules: DiscoveryRules::from(&config.discovery),
        namespace,
        verbosity: config.runner.verbosity,
        install_hint: install_hint(&options),
    };

    let mut stdout = std::io::stdout();
    let result = run_tests(&plan, requirements.as_slice(), &interpreter, &loader, &mut stdout).await?;
    Ok(result.exit_code())
}

/// Bootstrap the installer, then install every requirement.
///
/// A non-zero exit from either step is escalated to [`Error::InstallFailed`].
pub async fn install_deps(resolver: &DependencyResolver, requirements: &[Requirement]) -> Result<()> {
    if let Some(code) = resolver.ensure_installer_present().await? {
        if code != 0 {
            return Err(Error::InstallFailed {
                step: "pip bootstrap".to_string(),
                code,
            });
        }
    }

    match resolver.install_requirements(requirements).await? {
        Some(0) => println!("test dependencies installed"),
        Some(code) => {
            return Err(Error::InstallFailed {
                step: "pip install".to_string(),
                code,
            })
        }
        None => println!("no test dependencies required"),
    }
    Ok(())
}

/// Check every requirement is importable, then build and run the suite.
///
/// A missing requirement stops here: no module is discovered or loaded.
pub async fn run_tests<W: Write>(
    plan: &TestPlan,
    requirements: &[Requirement],
    probe: &dyn ModuleProbe,
    loader: &dyn ModuleLoader,
    out: &mut W,
) -> Result<RunResult> {
    if let Some(missing) = first_missing(requirements, probe).await? {
        return Err(Error::MissingDependency {
            requirement: missing.to_string(),
            hint: plan.install_hint.clone(),
        });
    }

    let suite = build_suite(&plan.dir, &plan.rules, &plan.namespace, loader).await?;
    run_with_output(&suite, plan.verbosity, out).await
}

/// Re-invocation of this command with `--install-deps`
fn install_hint(options: &Options) -> String {
    let program = std::env::args()
        .next()
        .and_then(|arg0| {
            PathBuf::from(arg0)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| "suiterun".to_string());

    let mut hint = format!("{program} --install-deps");
    if let Some(python) = &options.python {
        hint.push_str(&format!(" --python {}", python.display()));
    }
    if let Some(config) = &options.config {
        hint.push_str(&format!(" --config {}", config.display()));
    }
    hint
}
