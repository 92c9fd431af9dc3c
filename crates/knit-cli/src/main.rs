//! `knit`: render markdown documents with executed calc fragments

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use knit_calc::{CalcBackend, CalcContext};
use knit_core::{RewriteConfig, RewriteError, Rewriter, Rewritten, Settings};
use knit_document::markdown;
use knit_exec::CacheStore;
use rayon::prelude::*;
use std::collections::HashMap;
use std::panic::{self, Location};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Exit status of an interrupted run
const EXIT_CANCELLED: u8 = 130;

fn cli() -> Command {
    let files = Arg::new("files")
        .value_name("FILES")
        .required(true)
        .num_args(1..)
        .value_parser(value_parser!(PathBuf))
        .help("Markdown files to process");
    let config = Arg::new("config")
        .long("config")
        .short('c')
        .value_parser(value_parser!(PathBuf))
        .help("Settings file (default: ./knit.toml if present)");
    let quiet = Arg::new("quiet")
        .long("quiet")
        .short('q')
        .global(true)
        .action(ArgAction::SetTrue)
        .help("Only log warnings and errors");

    Command::new("knit")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Execute code fragments embedded in markdown documents")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(quiet)
        .subcommand(
            Command::new("render")
                .about("Render documents with fragment output and results")
                .arg(files.clone())
                .arg(config.clone())
                .arg(
                    Arg::new("out-dir")
                        .long("out-dir")
                        .short('o')
                        .value_parser(value_parser!(PathBuf))
                        .help("Write rendered files here instead of stdout"),
                ),
        )
        .subcommand(
            Command::new("check")
                .about("Run every fragment and fail if any of them fails")
                .arg(files)
                .arg(config),
        )
}

#[tokio::main]
async fn main() -> ExitCode {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("quiet"));
    install_panic_hook();

    match run(matches).await {
        Ok(code) => code,
        Err(err) if is_cancelled(&err) => {
            tracing::error!("{err:#}");
            ExitCode::from(EXIT_CANCELLED)
        }
        Err(err) => {
            tracing::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(quiet: bool) {
    let default = if quiet { "knit=warn" } else { "knit=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .init();
}

/// Send panic reports to the debug log instead of stderr
fn install_panic_hook() {
    panic::set_hook(Box::new(|info| {
        tracing::debug!("{}", describe_panic(info.payload(), info.location()));
    }));
}

fn describe_panic(payload: &(dyn std::any::Any + Send), location: Option<&Location<'_>>) -> String {
    let message = knit_exec::panic_message(payload);
    match location {
        Some(location) => format!("panicked at {location}: {message}"),
        None => format!("panicked: {message}"),
    }
}

async fn run(matches: ArgMatches) -> Result<ExitCode> {
    let Some((command, args)) = matches.subcommand() else {
        anyhow::bail!("no subcommand given");
    };
    let files: Vec<PathBuf> = args
        .get_many::<PathBuf>("files")
        .into_iter()
        .flatten()
        .cloned()
        .collect();
    let config = load_config(args.get_one::<PathBuf>("config").map(PathBuf::as_path))?;
    let out_dir = match command {
        "render" => args.get_one::<PathBuf>("out-dir").cloned(),
        _ => None,
    };
    let check = command == "check";
    let targets = match &out_dir {
        Some(dir) => output_targets(dir, &files)?,
        None => Vec::new(),
    };

    let backend = CalcBackend::new();
    let cancel = backend.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling");
            cancel.raise();
        }
    });

    let rewriter = Rewriter::new(backend).with_config(config);
    let rendered = tokio::task::spawn_blocking(move || render_all(&rewriter, &files))
        .await
        .context("render task failed")??;

    let mut failed = 0;
    for (index, (_, rewritten)) in rendered.iter().enumerate() {
        failed += rewritten.warnings.len();
        if check {
            for warning in &rewritten.warnings {
                eprintln!("{warning}");
            }
            continue;
        }
        let text = markdown::render(&rewritten.document);
        match targets.get(index) {
            Some(target) => write_output(target, &text)?,
            None => print!("{text}"),
        }
    }

    tracing::info!(documents = rendered.len(), failed, "done");
    Ok(if check && failed > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

/// Settings from an explicit path, else `./knit.toml`, else defaults
fn load_config(path: Option<&Path>) -> Result<RewriteConfig> {
    let settings = match path {
        Some(path) => Settings::load(path)?,
        None if Path::new("knit.toml").is_file() => Settings::load("knit.toml")?,
        None => Settings::default(),
    };
    Ok(settings.into_config()?)
}

/// Rewrite every file in parallel against one shared store
fn render_all(
    rewriter: &Rewriter<CalcBackend>,
    files: &[PathBuf],
) -> Result<Vec<(PathBuf, Rewritten)>> {
    let store: CacheStore<CalcContext> = CacheStore::new();
    files
        .par_iter()
        .map(|path| -> Result<(PathBuf, Rewritten)> {
            let document = markdown::read(path)?;
            let rewritten = rewriter
                .rewrite(&store, &document)
                .with_context(|| format!("failed to render {}", path.display()))?;
            Ok((path.clone(), rewritten))
        })
        .collect()
}

/// Output path per input file; two inputs may not share a target
fn output_targets(dir: &Path, files: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut claimed: HashMap<PathBuf, &Path> = HashMap::new();
    files
        .iter()
        .map(|source| -> Result<PathBuf> {
            let name = source
                .file_name()
                .with_context(|| format!("{} has no file name", source.display()))?;
            let target = dir.join(name);
            if let Some(previous) = claimed.insert(target.clone(), source) {
                anyhow::bail!(
                    "{} and {} would both be written to {}",
                    previous.display(),
                    source.display(),
                    target.display()
                );
            }
            Ok(target)
        })
        .collect()
}

fn write_output(target: &Path, text: &str) -> Result<()> {
    if let Some(dir) = target.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }
    std::fs::write(target, text).with_context(|| format!("failed to write {}", target.display()))?;
    tracing::debug!(path = %target.display(), "wrote document");
    Ok(())
}

fn is_cancelled(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<RewriteError>()
            .is_some_and(RewriteError::is_cancelled)
    })
}
