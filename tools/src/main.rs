mod convert;
mod detect;
mod inspect;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "charsoup-cli", about = "Inspect and convert CharSoup LDM1 models")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print a model's header fields, label list, and weight blob size.
    Inspect {
        /// Path to a single-file LDM1 model.
        model: PathBuf,
    },
    /// Split a single-file LDM1 model into a raw weight file and a metadata sidecar.
    ToSplit {
        /// Path to a single-file LDM1 model.
        input: PathBuf,
        /// Output path for the raw weight blob.
        #[arg(long, default_value = "model.weights")]
        weights_out: PathBuf,
        /// Output path for the metadata sidecar.
        #[arg(long, default_value = "model.meta")]
        meta_out: PathBuf,
    },
    /// Merge a split weight/meta pair back into a single-file LDM1 model.
    ToSingle {
        /// Path to the raw weight blob.
        weights: PathBuf,
        /// Path to the metadata sidecar.
        meta: PathBuf,
        /// Output path for the single-file LDM1 model.
        #[arg(long, default_value = "model.ldm1")]
        out: PathBuf,
    },
    /// Run ad-hoc detection over a text file's contents.
    Detect {
        /// Path to a single-file LDM1 model.
        model: PathBuf,
        /// Path to a UTF-8 text file.
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    match args.command {
        Command::Inspect { model } => inspect::run(&model),
        Command::ToSplit { input, weights_out, meta_out } => {
            convert::to_split(&input, &weights_out, &meta_out)
        }
        Command::ToSingle { weights, meta, out } => convert::to_single(&weights, &meta, &out),
        Command::Detect { model, file } => detect::run(&model, &file),
    }
}
