use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Args;
use githook_config::LimitSource;
use githook_scan::CommitRange;
use githook_utils::format_size;
use tracing::info;

use super::{scanner, HookArgs, HookContext};
use crate::Cli;

#[derive(Args)]
pub struct RefUpdateArgs {
    #[command(flatten)]
    hook: HookArgs,
}

pub fn run(args: &RefUpdateArgs, cli: &Cli, ctx: &HookContext) -> Result<i32> {
    let hook = &args.hook;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    writeln!(out, "project={}, ref={}", hook.project, hook.refname)?;
    writeln!(out, "uploader={}, username={}", hook.uploader, hook.uploader_username)?;
    writeln!(out, "oldRev={}", hook.oldrev)?;
    writeln!(out, "newRev={}", hook.newrev)?;
    info!(
        project = %hook.project,
        refname = %hook.refname,
        cmdref = hook.cmdref.as_deref().unwrap_or(""),
        "checking ref update"
    );

    if ctx.config.is_project_whitelisted(&hook.project) {
        writeln!(out, "Project {} is in the whitelist, exiting", hook.project)?;
        return Ok(0);
    }

    let limit = ctx.config.size_limit(&hook.project, &ctx.env);
    if limit.source == LimitSource::Project {
        writeln!(
            out,
            "Using project-specific size limit for {}: {}",
            hook.project,
            format_size(limit.bytes)
        )?;
    }

    let range = CommitRange::from_revisions(&hook.oldrev, &hook.newrev)?;
    let max = limit.bytes;
    let large = scanner(cli, hook, &ctx.env)?
        .oversized(&range, Box::new(move |size| size > max))
        .with_context(|| format!("size check of {} failed", range))?;

    if large.is_empty() {
        return Ok(0);
    }

    writeln!(out, "Found {} large files:", large.len())?;
    for file in &large {
        writeln!(
            out,
            "\tPath: {}, Size: {} bytes, Hash: {}",
            file.path, file.size, file.id
        )?;
    }
    if let Some(largest) = large.iter().map(|f| f.size).max() {
        writeln!(out, "Largest file: {}", format_size(largest))?;
    }
    writeln!(
        out,
        "Rejected: one or more files exceed maximum size of {}",
        format_size(max)
    )?;
    info!(project = %hook.project, files = large.len(), "ref update rejected");
    Ok(1)
}
