use std::io::{self, IsTerminal};

use anyhow::{Context, Result, bail};
use clap::{CommandFactory, Parser};
use optical_core::{HttpClient, Pipeline, ResponseCache};
use tracing::{debug, info, warn};
use url::Url;

use crate::ProcessExit;
use crate::app::{exit_handler, output, progress::DownloadProgress, terminal};
use crate::app_config::{self, FileConfig};
use crate::cli::Args;

const NO_HOST_MESSAGE: &str =
    "No host given.\nSet the default with -H, or for the invocation with -h.";

pub(crate) async fn run_optical() -> Result<ProcessExit> {
    let args = Args::parse();

    let dumb_terminal = terminal::is_dumb_terminal();
    let no_color = terminal::should_disable_color(terminal::no_color_env_requested(), dumb_terminal);
    terminal::init_tracing(
        terminal::resolve_default_log_level(args.verbose, args.quiet),
        no_color,
    );
    debug!(?args, "CLI arguments parsed");

    let loaded = app_config::load_default_file_config()?;
    if loaded.loaded_from_file
        && let Some(path) = loaded.path.as_deref()
    {
        debug!(path = %path.display(), "Loaded config file");
    }
    let mut config = loaded.config;

    if let Some(raw) = args.set_default_host.as_deref() {
        if let Err(error) = app_config::parse_host(raw) {
            eprintln!("{error:#}");
            return Ok(ProcessExit::Invalid);
        }
        let Some(path) = loaded.path.as_deref() else {
            bail!("Cannot save the default host: neither XDG_CONFIG_HOME nor HOME is set");
        };
        config.default_host = Some(raw.trim().to_string());
        app_config::save_file_config(path, &config)?;
        info!(host = raw, path = %path.display(), "Saved default host");
    }

    let host = match resolve_host(&args, &config) {
        Ok(Some(host)) => host,
        Ok(None) => {
            eprintln!("{NO_HOST_MESSAGE}");
            return Ok(ProcessExit::Invalid);
        }
        Err(error) => {
            eprintln!("{error:#}");
            return Ok(ProcessExit::Invalid);
        }
    };

    if !args.just.is_empty() {
        info!("Will print only {}", args.just.join(", "));
    }

    let client = HttpClient::with_timeouts(config.connect_timeout(), config.read_timeout())
        .context("Failed to build HTTP client")?;
    let pipeline = Pipeline::new(host, client, build_cache(&config, args.refresh));

    let use_progress = terminal::should_use_progress_bar(
        io::stderr().is_terminal(),
        args.quiet,
        dumb_terminal,
    );
    let mut progress = DownloadProgress::new(use_progress);

    let outcome = {
        let query = pipeline.query(args.filters.as_slice(), args.field_mode(), |event| {
            progress.update(event);
        });
        tokio::select! {
            result = query => Some(result),
            Ok(()) = tokio::signal::ctrl_c() => None,
        }
    };
    progress.finish();

    let result = match outcome {
        Some(Ok(result)) => result,
        Some(Err(error)) => {
            eprintln!("{error}");
            if error.is_usage_error() {
                eprintln!("\n{}", Args::command().render_usage());
            }
            return Ok(exit_handler::exit_for_error(&error));
        }
        None => {
            warn!("Interrupted, no output written");
            return Ok(ProcessExit::Interrupted);
        }
    };

    let pretty = args.pretty.unwrap_or_else(|| io::stdout().is_terminal());
    let mode = output::OutputMode::from_args(&args.just, pretty);
    let mut stdout = io::BufWriter::new(io::stdout().lock());
    match output::write_records(&mut stdout, &result.records, &mode) {
        Err(error) if error.kind() == io::ErrorKind::BrokenPipe => {
            debug!("stdout closed early");
        }
        other => other.context("Failed to write output")?,
    }

    Ok(exit_handler::determine_exit_outcome(result.records.len()))
}

/// `--host` beats `--set-default-host`, which beats the configured default.
fn resolve_host(args: &Args, config: &FileConfig) -> Result<Option<Url>> {
    let raw = args
        .host
        .as_deref()
        .or(args.set_default_host.as_deref())
        .or(config.default_host.as_deref());
    raw.map(app_config::parse_host).transpose()
}

fn build_cache(config: &FileConfig, refresh: bool) -> Option<ResponseCache> {
    let Some(root) = app_config::resolve_default_cache_root() else {
        warn!("No cache directory (XDG_CACHE_HOME and HOME unset), caching disabled");
        return None;
    };
    let cache = ResponseCache::with_max_age(root, config.cache_max_age());

    match cache.purge_expired() {
        Ok(0) => {}
        Ok(removed) => debug!(removed, "Purged expired cache entries"),
        Err(error) => warn!(%error, "Failed to purge expired cache entries"),
    }
    if refresh {
        match cache.clear_all() {
            Ok(()) => info!(root = %cache.root().display(), "Cleared response cache"),
            Err(error) => warn!(%error, "Failed to clear response cache"),
        }
    }
    Some(cache)
}
