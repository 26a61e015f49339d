use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Args;
use githook_scan::CommitRange;
use githook_utils::format_size;

use super::{scanner, HookArgs, HookContext};
use crate::Cli;

#[derive(Args)]
pub struct CommitReceivedArgs {
    #[command(flatten)]
    hook: HookArgs,

    /// Report files larger than this many bytes
    #[arg(long, default_value_t = 5 * 1024)]
    max_size: u64,
}

pub fn run(args: &CommitReceivedArgs, cli: &Cli, ctx: &HookContext) -> Result<i32> {
    let hook = &args.hook;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    writeln!(out, "Project name: {}", hook.project)?;
    writeln!(out, "Uploader information: {}", hook.uploader)?;
    writeln!(out, "Uploader username: {}", hook.uploader_username)?;
    writeln!(out, "Old commit hash: {}", hook.oldrev)?;
    writeln!(out, "New commit hash: {}", hook.newrev)?;
    writeln!(out, "Reference name: {}", hook.refname)?;

    let range = CommitRange::from_revisions(&hook.oldrev, &hook.newrev)?;
    let max = args.max_size;
    let large = scanner(cli, hook, &ctx.env)?
        .oversized(&range, Box::new(move |size| size > max))
        .with_context(|| format!("scan of {} failed", range))?;

    writeln!(out, "Found {} files larger than {}:", large.len(), format_size(max))?;
    for file in &large {
        writeln!(
            out,
            "Path: {}, Size: {} bytes, Hash: {}",
            file.path, file.size, file.id
        )?;
    }
    Ok(0)
}
