use anyhow::Result;
use clap::Parser;
use seq2seq_transformer::{cli::Cli, infra::run_log::RunLog};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("seq2seq_transformer=info"));

    // stdout, plus <experiment>/training.log while a run is active
    let run_log = RunLog::default();
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(run_log.clone()))
        .init();

    let cli = Cli::parse();
    cli.run(&run_log)
}
