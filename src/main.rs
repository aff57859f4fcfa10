//! Hook entry point for the cloud-support charm.

use std::env;
use std::io::{self, Write};
use std::process;

use camino::Utf8PathBuf;
use clap::Parser;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use cloudsupport_charm::{
    CharmError, CloudSupportCharm, CloudSupportHelper, EventError, FileStateStore,
    HookEnvironment, HookEvent, HookTools, LogLevel, OsTestingCli, ProcessCommandRunner,
    RuntimeConfig, RuntimeConfigError,
};

mod cli;

use cli::Cli;

const LOG_FILTER_ENV: &str = "CLOUDSUPPORT_LOG";

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] RuntimeConfigError),
    #[error(transparent)]
    Event(#[from] EventError),
    #[error("{event} failed: {source}")]
    Charm {
        event: HookEvent,
        #[source]
        source: CharmError,
    },
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let exit_code = match run(&cli) {
        Ok(()) => 0,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<(), CliError> {
    let runtime = RuntimeConfig::load_without_cli_args()?;
    runtime.validate()?;
    let tools = hook_tools(&runtime);

    let result = dispatch(cli, &runtime, &tools);
    if let Err(ref err) = result {
        report_to_juju(&tools, err);
    }
    result
}

fn dispatch(
    cli: &Cli,
    runtime: &RuntimeConfig,
    tools: &HookTools<ProcessCommandRunner>,
) -> Result<(), CliError> {
    let event = resolve_event(cli)?;
    tracing::debug!(%event, "dispatching");

    CloudSupportCharm::new(
        tools.clone(),
        FileStateStore::new(runtime.state_dir.as_str()),
        CloudSupportHelper::new(runtime.tool_config_dir.as_str()),
        OsTestingCli::with_process_runner(runtime.os_testing_bin.as_str()),
    )
    .and_then(|mut charm| charm.dispatch(&event))
    .map_err(|source| CliError::Charm { event, source })
}

fn resolve_event(cli: &Cli) -> Result<HookEvent, EventError> {
    if let Some(ref path) = cli.dispatch_path {
        return HookEvent::from_dispatch_path(path);
    }
    let invoked_as = env::args().next().unwrap_or_default();
    HookEvent::from_dispatch_path(&invoked_as)
}

fn hook_tools(runtime: &RuntimeConfig) -> HookTools<ProcessCommandRunner> {
    HookTools::with_process_runner(runtime.hook_tools_dir.as_deref().map(Utf8PathBuf::from))
}

/// Whether the failure belongs to an action invocation.
fn fails_action(err: &CliError) -> bool {
    match *err {
        CliError::Charm { ref event, .. } => event.is_action(),
        CliError::Event(EventError::UnknownAction(_)) => true,
        CliError::Config(_) | CliError::Event(_) => false,
    }
}

fn report_to_juju(env: &impl HookEnvironment, err: &CliError) {
    let message = err.to_string();
    if let Err(log_err) = env.log(LogLevel::Error, &message) {
        tracing::debug!(error = %log_err, "juju-log unavailable");
    }
    if fails_action(err)
        && let Err(fail_err) = env.fail_action(&message)
    {
        tracing::debug!(error = %fail_err, "action-fail unavailable");
    }
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}
