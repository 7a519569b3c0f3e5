//! biodist CLI: train a DNA model from sequences, then print its weights or
//! sample from it.
//!
//! Thin wrapper over the `biodist` library crate.

use std::error::Error;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use biodist::{AtomicSymbol, DistRef, SequenceModel, ViewCache, dna, load_sequences, parse_sequences, tokens};
use clap::Parser;
use log::{debug, warn};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde_json::json;

/// biodist: train order-K nucleotide distributions and sample from them.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// Context length in nucleotides. 0 trains a single distribution.
    #[arg(long, default_value_t = 1)]
    order: usize,

    /// Training file, one sequence per line. Reads stdin when absent.
    #[arg(long)]
    train: Option<PathBuf>,

    /// Pseudo-count weight of the uniform null model.
    #[arg(long, default_value_t = 0.0)]
    null_weight: f64,

    /// PRNG seed for reproducible sampling.
    #[arg(long)]
    seed: Option<u64>,

    /// Sample a sequence of this length instead of printing weights.
    #[arg(long)]
    sample: Option<usize>,

    /// Report the complementary strand.
    #[arg(long)]
    complement: bool,

    /// Print weights as JSON snapshots.
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("biodist: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Box<dyn Error>> {
    let sequences = match &args.train {
        Some(path) => {
            debug!("training from {}", path.display());
            load_sequences(path).map_err(|e| format!("{}: {e}", path.display()))?
        }
        None => {
            let mut input = String::new();
            io::stdin().read_to_string(&mut input)?;
            parse_sequences(&input)
        }
    };
    if sequences.is_empty() {
        warn!("no training sequences");
    }

    let mut model = SequenceModel::new(args.order)?;
    model.set_null_model_weight(args.null_weight);
    for seq in &sequences {
        model.learn(seq)?;
    }
    model.train()?;

    match args.sample {
        Some(len) => sample(&model, len, args),
        None => report(&model, args),
    }
}

fn sample(model: &SequenceModel, len: usize, args: &Args) -> Result<(), Box<dyn Error>> {
    let untrained = model.untrained_contexts()?;
    if !untrained.is_empty() {
        let what = if model.order() == 0 {
            "the model".to_string()
        } else {
            format!("context(s) {}", untrained.join(", "))
        };
        return Err(format!("no training data for {what}; train more or pass --null-weight").into());
    }

    let mut rng = match args.seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_rng(&mut rand::rng()),
    };
    let mut seq = model.generate(len, &mut rng)?;
    if args.complement {
        seq = seq.iter().map(dna::complement_symbol).collect::<Result<_, _>>()?;
    }
    println!("{}", dna::to_text(&seq));
    Ok(())
}

fn report(model: &SequenceModel, args: &Args) -> Result<(), Box<dyn Error>> {
    let contexts = if args.complement {
        model.complement(&ViewCache::global())?
    } else {
        model.contexts()
    };

    if args.json {
        return print_json(&contexts);
    }
    for (ctx, dist) in &contexts {
        let prefix = ctx.as_ref().map(|c| format!("{}\t", tokens(c))).unwrap_or_default();
        for (sym, weight) in dist.weights()? {
            println!("{prefix}{}\t{weight:.6}", tokens(&sym));
        }
    }
    Ok(())
}

/// A single context-free distribution prints as its bare snapshot; order-K
/// models print one `{context, snapshot}` object per context.
fn print_json(contexts: &[(Option<AtomicSymbol>, DistRef)]) -> Result<(), Box<dyn Error>> {
    let out = match contexts {
        [(None, dist)] => serde_json::to_value(dist.snapshot()?)?,
        _ => {
            let mut entries = Vec::with_capacity(contexts.len());
            for (ctx, dist) in contexts {
                entries.push(json!({
                    "context": ctx.as_ref().map(tokens).unwrap_or_default(),
                    "snapshot": dist.snapshot()?,
                }));
            }
            serde_json::Value::Array(entries)
        }
    };
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
