//! Command-line interface definitions for the `cloudsupport-charm` binary.
//!
//! Juju starts the binary without arguments; the event comes from
//! `JUJU_DISPATCH_PATH`. The flag exists so the binary can also be driven by
//! hand when debugging a unit. The build script reuses this parser to
//! generate the manual page.

use clap::Parser;

/// Top-level CLI for the `cloudsupport-charm` binary.
#[derive(Debug, Parser)]
#[command(
    name = "cloudsupport-charm",
    about = "Juju hook entry point for the cloud-support charm"
)]
pub(crate) struct Cli {
    /// Event to handle, as `hooks/<name>` or `actions/<name>`. Defaults to
    /// the name the binary was invoked as.
    #[arg(long, env = "JUJU_DISPATCH_PATH", value_name = "PATH")]
    pub(crate) dispatch_path: Option<String>,
}
