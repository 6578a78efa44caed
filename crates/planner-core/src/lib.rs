pub mod board;
pub mod calendar;
pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod notify;
pub mod render;
pub mod reorder;
pub mod schedule;
pub mod store;
pub mod task;
pub mod utilities;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use tracing::info;

#[tracing::instrument(skip_all)]
pub fn run(raw_args: Vec<OsString>) -> anyhow::Result<()> {
    let cli = cli::GlobalCli::parse_from(raw_args);

    cli::init_tracing(cli.verbose, cli.quiet)?;

    info!(verbose = cli.verbose, quiet = cli.quiet, "starting planner CLI");

    let mut cfg = config::Config::load(cli.plannerrc.as_deref())?;
    cfg.apply_overrides(cli.rc_overrides.into_iter().map(|kv| (kv.key, kv.value)));

    let data_dir = config::resolve_data_dir(&cfg, cli.data.as_deref())
        .context("failed to resolve data directory")?;

    let tasks_port = store::FileSnapshot::new(data_dir.join("todos.json"));
    let tasks = store::TaskStore::open(Box::new(tasks_port))
        .with_context(|| format!("failed to open task store in {}", data_dir.display()))?;

    let text_limit = cfg.get_usize("board.text.limit").unwrap_or(25);
    let mut board = board::BoardController::new(
        tasks,
        Box::new(notify::ConsoleNotifier),
        text_limit,
    );

    let schedule_port = store::FileSnapshot::new(data_dir.join("schedule.json"));
    let mut schedule = schedule::Schedule::open(Box::new(schedule_port))
        .with_context(|| format!("failed to open schedule in {}", data_dir.display()))?;

    let mut renderer = render::Renderer::new(&cfg)?;
    let inv = cli::Invocation::parse(&cfg, cli.rest)?;

    commands::dispatch(&mut board, &mut schedule, &cfg, &mut renderer, inv)?;

    info!("done");
    Ok(())
}
