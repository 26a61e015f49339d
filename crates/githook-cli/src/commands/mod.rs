pub mod commit_received;
pub mod ref_update;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use githook_config::{init_logging, ConfigError, EnvOverrides, HookConfig, LogSettings};
use githook_scan::{FailurePolicy, Repo, Scanner};
use tracing::{debug, warn};

use crate::Cli;

#[derive(Subcommand)]
pub enum Commands {
    /// Reject a ref update that introduces files above the size limit
    RefUpdate(ref_update::RefUpdateArgs),
    /// Report files above a size threshold in a received commit range
    CommitReceived(commit_received::CommitReceivedArgs),
}

/// Arguments Gerrit passes to both hooks.
#[derive(Args, Debug)]
pub struct HookArgs {
    /// Project name
    #[arg(long, default_value = "")]
    pub project: String,

    /// Uploader information
    #[arg(long, default_value = "")]
    pub uploader: String,

    /// Uploader username
    #[arg(long, default_value = "")]
    pub uploader_username: String,

    /// Old commit hash (all zeros for a new ref)
    #[arg(long)]
    pub oldrev: String,

    /// New commit hash (all zeros for a deleted ref)
    #[arg(long)]
    pub newrev: String,

    /// Reference name
    #[arg(long, default_value = "")]
    pub refname: String,

    /// Command reference (e.g. refs/for/main)
    #[arg(long)]
    pub cmdref: Option<String>,

    /// Keep scanning when a batch query fails instead of aborting
    #[arg(long)]
    pub tolerate_failures: bool,
}

/// State shared by every hook run: environment and loaded configuration.
pub struct HookContext {
    pub env: EnvOverrides,
    pub config: HookConfig,
}

impl HookContext {
    /// Read the environment and configuration, then install the logger the
    /// configuration asks for.
    fn init() -> Result<Self> {
        let env = EnvOverrides::from_env();
        let (config, problem) = HookConfig::discover(&env);

        let settings = LogSettings::resolve(&config.log_config, &env)?;
        init_logging(&settings)?;

        // Reported only now that the logger exists.
        match problem {
            Some(e) if e.is_missing_file() => debug!(error = %e, "no config file, using empty config"),
            Some(ConfigError::NoHome) => warn!("no home directory set, using empty config"),
            Some(e) => warn!(error = %e, "config file unusable, using empty config"),
            None => {}
        }

        Ok(Self { env, config })
    }
}

pub fn open_repo(cli: &Cli, env: &EnvOverrides) -> Result<Repo> {
    let dir = cli.git_dir.clone().unwrap_or_else(|| ".".into());
    let mut repo = Repo::open(&dir);
    if let Some(program) = &env.git_program {
        repo = repo.with_program(program);
    }
    repo.ensure_repository()
        .with_context(|| format!("cannot inspect '{}'", dir.display()))
}

pub fn scanner(cli: &Cli, hook: &HookArgs, env: &EnvOverrides) -> Result<Scanner> {
    let policy = if hook.tolerate_failures {
        FailurePolicy::Tolerate
    } else {
        FailurePolicy::Escalate
    };
    Ok(Scanner::new(open_repo(cli, env)?).failure_policy(policy))
}

pub fn run(cli: Cli) -> Result<i32> {
    let ctx = HookContext::init()?;
    match &cli.command {
        Commands::RefUpdate(args) => ref_update::run(args, &cli, &ctx),
        Commands::CommitReceived(args) => commit_received::run(args, &cli, &ctx),
    }
}
