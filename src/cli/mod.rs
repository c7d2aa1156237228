// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses the command line with clap and hands off to Layer 2.
//
//   1. `encode`  — tokenize splits into the encoding cache
//   2. `prepare` — batch and finalize one epoch, record stats
//   3. `inspect` — show one instance decoded by segment
//
// This layer routes and prints; it never computes.

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EncodeArgs, InspectArgs, PrepareArgs};

use crate::application::config::PipelineConfig;

#[derive(Parser, Debug)]
#[command(
    name = "knowledge-dialog-data",
    version = "0.1.0",
    about = "Tokenize, assemble and batch knowledge-grounded dialogues."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Encode(args)  => run_encode(args),
            Commands::Prepare(args) => run_prepare(args),
            Commands::Inspect(args) => run_inspect(args),
        }
    }
}

fn run_encode(args: EncodeArgs) -> Result<()> {
    use crate::application::encode_use_case::EncodeUseCase;

    let cfg = PipelineConfig::try_from(args.pipeline)?;
    tracing::info!("Encoding {} splits from '{}'", cfg.stage, cfg.data_path);

    for split in EncodeUseCase::new(cfg, args.overwrite).execute()? {
        match split.stats {
            Some(s) => println!(
                "{}: {} samples ({} dialogues, {} without passages, {} empty knowledge)",
                split.split, split.samples, s.dialogues, s.skipped_sentinel, s.skipped_empty
            ),
            None => println!("{}: {} samples (cached)", split.split, split.samples),
        }
    }
    Ok(())
}

fn run_prepare(args: PrepareArgs) -> Result<()> {
    use crate::application::prepare_use_case::PrepareUseCase;

    let cfg    = PipelineConfig::try_from(args.pipeline)?;
    let leader = cfg.is_leader();

    let stats = PrepareUseCase::new(cfg).execute()?;
    if leader {
        for s in stats {
            println!(
                "{}: {} samples, {} truncated, {} batches, {} supervised tokens",
                s.split, s.samples, s.truncated, s.batches, s.supervised_tokens
            );
        }
    }
    Ok(())
}

fn run_inspect(args: InspectArgs) -> Result<()> {
    use crate::application::inspect_use_case::InspectUseCase;

    let cfg    = PipelineConfig::try_from(args.pipeline)?;
    let report = InspectUseCase::new(cfg, args.split, args.index).execute()?;
    print!("{}", report.render());
    Ok(())
}
