use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use flow_types::{RunContext, RunId};
use pipeline::config::SystemConfig;
use pipeline::event_log::{EventLog, TagSink};
use pipeline::graph::PipelineGraph;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Builds a dataflow pipeline from a JSON configuration and runs it.
#[derive(Parser, Debug)]
#[command(name = "pl_sim", version, about)]
struct Args {
    /// Pipeline configuration file
    #[arg(short, long)]
    config: PathBuf,

    /// Directory for the process log and the event log
    #[arg(long, default_value = ".")]
    log_dir: PathBuf,

    /// Overrides `__general__.__data_file_name__`
    #[arg(long)]
    data_file: Option<PathBuf>,

    /// Fixed run id in hex, for reproducible log names
    #[arg(long)]
    run_id: Option<String>,

    /// Only print the pipeline, do not run it
    #[arg(long)]
    print: bool,
}

fn main() {
    let args = Args::parse();

    let run_id = match args.run_id.as_deref().map(RunId::from_hex).transpose() {
        Ok(run_id) => run_id.unwrap_or_else(RunId::from_random),
        Err(e) => {
            eprintln!("pl_sim: {}", e);
            std::process::exit(2);
        }
    };

    if let Err(e) = fs::create_dir_all(&args.log_dir) {
        eprintln!("pl_sim: cannot create log directory {:?}: {}", args.log_dir, e);
        std::process::exit(2);
    }

    let file_appender =
        tracing_appender::rolling::never(&args.log_dir, format!("pl_{}.log", run_id.hex()));
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pipeline=info,pl_sim=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_file(true)
                .with_line_number(true),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_file(true)
                .with_line_number(true),
        )
        .init();

    if let Err(e) = run(&args, run_id) {
        tracing::error!("Pipeline failed: {:#}", e);
        drop(guard);
        std::process::exit(1);
    }
    drop(guard);
}

fn run(args: &Args, run_id: RunId) -> anyhow::Result<()> {
    let text = fs::read_to_string(&args.config)
        .with_context(|| format!("reading configuration {:?}", args.config))?;
    let mut config = SystemConfig::from_json(&text)
        .with_context(|| format!("parsing configuration {:?}", args.config))?;
    if let Some(data_file) = &args.data_file {
        config.general.data_file_name = data_file.to_string_lossy().into_owned();
    }

    let context = RunContext::with_run_id(run_id).shared();
    tracing::info!(run_id = %run_id, config = ?args.config, "pl_sim starting");

    let mut graph = PipelineGraph::build(&config, context)?;
    graph.print_pipeline();
    if args.print {
        return Ok(());
    }

    graph.connect_processors()?;
    let event_log = Arc::new(EventLog::new(&args.log_dir, run_id));
    graph.connect_logger(event_log.clone())?;
    graph.run()?;
    event_log.flush()?;

    tracing::info!(nodes = graph.size(), path = ?event_log.path(), "Run complete");
    Ok(())
}
