//! CLI argument parsing with clap derive

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Parser;

use crate::app::AppContext;
use crate::application::ports::SettingsSource;
use crate::commands;
use crate::commands::push::PushArgs;
use crate::domain::error::WatchError;
use crate::infra::config::YamlSettingsSource;
use crate::infra::privileges;

/// Foreman external node classifier and fact uploader for Puppet servers
#[derive(Parser, Debug)]
#[command(name = "foreman-enc", version)]
pub struct Cli {
    /// Node to classify, or the only node to push facts for
    pub certname: Option<String>,

    /// Remove the top-level environment from the ENC output
    #[arg(long)]
    pub no_environment: bool,

    /// Upload fact files to Foreman with a single worker instead of classifying
    #[arg(long, conflicts_with = "push_facts_parallel")]
    pub push_facts: bool,

    /// Upload fact files to Foreman with the configured number of workers
    #[arg(long)]
    pub push_facts_parallel: bool,

    /// Keep uploading fact files as they change (needs a push flag)
    #[arg(long)]
    pub watch_facts: bool,

    /// Convert a Puppet YAML run report and send it to Foreman
    #[arg(
        long,
        value_name = "FILE",
        conflicts_with_all = ["push_facts", "push_facts_parallel", "watch_facts", "no_environment"]
    )]
    pub report: Option<PathBuf>,

    /// Settings file [default: $FOREMAN_ENC_SETTINGS, then the OS location]
    #[arg(long, value_name = "PATH")]
    pub settings: Option<PathBuf>,
}

/// What the invocation asks for.
#[derive(Debug)]
enum Mode {
    Classify { certname: String, no_environment: bool },
    Push(PushArgs),
    Report(PathBuf),
}

impl Cli {
    fn mode(&self) -> Result<Mode> {
        if let Some(path) = &self.report {
            return Ok(Mode::Report(path.clone()));
        }
        if self.push_facts || self.push_facts_parallel {
            return Ok(Mode::Push(PushArgs {
                certname: self.certname.clone(),
                parallel: self.push_facts_parallel,
                watch: self.watch_facts,
            }));
        }
        if self.watch_facts {
            bail!("Cannot watch for facts without specifying --push-facts or --push-facts-parallel");
        }
        match &self.certname {
            Some(certname) => Ok(Mode::Classify {
                certname: certname.clone(),
                no_environment: self.no_environment,
            }),
            None => bail!("Must provide certname as an argument"),
        }
    }

    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the flags are inconsistent, the settings cannot be
    /// loaded, or the selected command fails.
    pub async fn run(self) -> Result<()> {
        let mode = self.mode()?;
        let settings = YamlSettingsSource::new(self.settings).load()?;
        privileges::drop_privileges(&settings.puppet_user);
        let app = AppContext::new(settings);

        match mode {
            Mode::Classify {
                certname,
                no_environment,
            } => commands::enc::run(&app, &certname, no_environment).await,
            Mode::Push(args) => commands::push::run(&app, args).await,
            Mode::Report(path) => commands::report::run(&app, &path).await,
        }
    }
}

/// Process exit status for a failed run.
#[must_use]
pub fn exit_code(error: &anyhow::Error) -> i32 {
    error
        .downcast_ref::<WatchError>()
        .map_or(1, |e| i32::from(e.exit_code()))
}
