// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses arguments with clap and hands off to Layer 2:
//
//   `train`  → TrainUseCase   (writes an experiment folder)
//   `decode` → DecodeUseCase  (prints the greedy decoding)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, DecodeArgs, TrainArgs};

use crate::domain::traits::Translator;
use crate::infra::run_log::RunLog;

#[derive(Parser, Debug)]
#[command(
    name = "seq2seq-transformer",
    version,
    about = "Train an encoder/decoder Transformer on a copy task or a parallel corpus, then decode."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// `run_log` is the file writer of the installed subscriber.
    pub fn run(self, run_log: &RunLog) -> Result<()> {
        match self.command {
            Commands::Train(args)  => run_train(args, run_log),
            Commands::Decode(args) => run_decode(args),
        }
    }
}

fn run_train(args: TrainArgs, run_log: &RunLog) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training: task {:?}", args.task);
    let loss = TrainUseCase::new(args.into())
        .with_run_log(run_log.clone())
        .execute()?;

    println!("Training complete. Final validation loss: {loss:.4}");
    Ok(())
}

fn run_decode(args: DecodeArgs) -> Result<()> {
    use crate::application::decode_use_case::DecodeUseCase;

    let use_case = DecodeUseCase::new((&args).into())?;
    let output   = use_case.translate(&args.input)?;

    println!("{output}");
    Ok(())
}
