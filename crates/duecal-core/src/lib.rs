pub mod book;
pub mod calendar;
pub mod classify;
pub mod cli;
pub mod commands;
pub mod config;
pub mod datastore;
pub mod datetime;
pub mod error;
pub mod filter;
pub mod reminder;
pub mod render;
pub mod task;
pub mod update;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

pub use crate::error::{
  CoreError,
  CoreResult
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let cli =
    cli::GlobalCli::parse_from(raw_args);

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting duecal"
  );
  debug!(overrides = ?cli.rc_overrides, "rc overrides");

  let mut cfg = config::Config::load(
    cli.config.as_deref()
  )?;
  cfg.apply_overrides(
    cli
      .rc_overrides
      .into_iter()
      .map(|kv| (kv.key, kv.value))
  );

  let data_dir =
    config::resolve_data_dir(
      &cfg,
      cli.data.as_deref()
    )
    .context(
      "failed to resolve data \
       directory"
    )?;

  let store =
    datastore::JsonFileStore::open(
      &data_dir
    )
    .with_context(|| {
      format!(
        "failed to open datastore at \
         {}",
        data_dir.display()
      )
    })?;

  let pinned_today = cli
    .today
    .as_deref()
    .map(datetime::parse_iso_day)
    .transpose()
    .context("invalid --today")?;
  let clock = commands::Clock {
    pinned_today
  };

  let mut renderer =
    render::Renderer::stdout(&cfg)?;
  let command = cli.command.unwrap_or(
    cli::CliCommand::List {
      filter:
        cli::FilterArgs::default()
    }
  );

  commands::dispatch(
    &store,
    &cfg,
    &mut renderer,
    command,
    clock
  )?;

  info!("done");
  Ok(())
}
