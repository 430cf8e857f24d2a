mod bench;
mod decode;
mod generator;
mod job;
mod stats;

use anyhow::Result;
use clap::{Parser, Subcommand};
use job::{CodeArgs, JobArgs};
use trellis_io::writer;

#[derive(Parser)]
#[command(name = "trellis", about = "Viterbi and BCJR decoding over arbitrary trellises")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode random messages and write noisy branch costs plus the reference bits.
    Gen {
        #[command(flatten)]
        code: CodeArgs,
        #[arg(long, default_value = "bench.f32")]
        metrics: String,
        #[arg(long, default_value = "bench.b8")]
        reference: String,
        #[arg(long, default_value_t = 1024)]
        block_len: usize,
        #[arg(long, default_value_t = 1000)]
        blocks: usize,
        #[arg(long, default_value_t = job::DEFAULT_NOISE_VAR)]
        noise_var: f64,
        #[arg(long, default_value_t = 12345)]
        seed: u64,
    },
    /// Decode a metric file block by block.
    Decode {
        #[command(flatten)]
        job: JobArgs,
        #[arg(short, long)]
        out: Option<String>,
    },
    /// Decode all blocks in parallel and report throughput.
    Bench {
        #[command(flatten)]
        job: JobArgs,
    },
    /// Print a trellis in FSM text format.
    Inspect {
        #[command(flatten)]
        code: CodeArgs,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Gen {
            code,
            metrics,
            reference,
            block_len,
            blocks,
            noise_var,
            seed,
        } => {
            let trellis = code.load()?;
            let params = generator::GenParams {
                block_len,
                blocks,
                noise_var,
                seed,
            };
            generator::generate_awgn_data(&trellis, &metrics, &reference, &params)?;
        }
        Commands::Decode { job, out } => {
            decode::run_decode(&job, out.as_deref())?;
        }
        Commands::Bench { job } => {
            bench::run_benchmark(&job)?;
        }
        Commands::Inspect { code } => {
            let trellis = code.load()?;
            print!("{}", writer::format_fsm(&trellis));
        }
    }
    Ok(())
}
