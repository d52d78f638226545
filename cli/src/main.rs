use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{ensure, Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use csx::{
    build_mt, build_mt_sym, partition_stream, partition_stream_sym, CooElem, EncodingOptions,
    RuntimeConfig,
};

mod mmf;

/// Encode Matrix Market files with the CSX engine and verify the result.
///
/// Thread placement and encoding tunables come from the environment:
/// MT_CONF, XFORM_CONF, WINDOW_SIZE, SAMPLES, SAMPLING_PROB, SPLIT_BLOCKS
/// and ENCODE_DELTAS.
#[derive(Parser, Debug)]
#[command(name = "csxbench")]
struct Args {
    /// Use the symmetric representation (lower triangle plus diagonal).
    #[arg(short = 's')]
    symmetric: bool,

    /// Disable the split-blocks optimization.
    #[arg(short = 'b')]
    no_split_blocks: bool,

    /// Matrix Market files to encode.
    #[arg(required = true, value_name = "mmf_file")]
    files: Vec<PathBuf>,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if e.kind() == ErrorKind::DisplayHelp || e.kind() == ErrorKind::DisplayVersion => {
            print!("{e}");
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            eprint!("{e}");
            return ExitCode::from(1);
        }
    };

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("csxbench: {e:#}");
            ExitCode::from(1)
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let rt = RuntimeConfig::from_env()?;
    let mut opts = EncodingOptions::from_env()?;
    // The optimization is on for the benchmark driver unless -b disables
    // it, overriding whatever the environment says.
    opts.split_blocks = !args.no_split_blocks;

    for path in &args.files {
        process(path, args.symmetric, &opts, &rt)
            .with_context(|| format!("processing {}", path.display()))?;
    }
    Ok(())
}

fn process(path: &Path, symmetric: bool, opts: &EncodingOptions, rt: &RuntimeConfig) -> Result<()> {
    let matrix = mmf::read(path)?;
    println!(
        "{}: {} x {}, {} stored entries",
        path.display(),
        matrix.nr_rows,
        matrix.nr_cols,
        matrix.entries.len()
    );

    if symmetric {
        ensure!(
            matrix.symmetric,
            "-s requires a symmetric Matrix Market file"
        );
        let want = triples(&matrix.entries);
        let nnz = matrix.entries.len();
        let parts = partition_stream_sym(
            matrix.entries,
            matrix.nr_rows,
            matrix.nr_cols,
            nnz,
            rt.nr_threads(),
        );
        let mt = build_mt_sym(parts, opts, rt);
        verify(&want, mt.points(), "lower triangle")?;
        println!("csx-sym size: {} bytes over {} threads", mt.size(), mt.nr_threads());
    } else {
        let coo = matrix.expanded();
        let want = triples(&coo);
        let nnz = coo.len();
        let parts = partition_stream(coo, matrix.nr_rows, matrix.nr_cols, nnz, rt.nr_threads());
        let mt = build_mt(parts, opts, rt);
        verify(&want, mt.points(), "matrix")?;
        println!("csx size: {} bytes over {} threads", mt.size(), mt.nr_threads());
    }
    println!("check passed");
    Ok(())
}

fn triples(coo: &[CooElem<i64, f64>]) -> Vec<(i64, i64, f64)> {
    let mut out: Vec<(i64, i64, f64)> = coo.iter().map(|p| (p.row, p.col, p.val)).collect();
    out.sort_by(|a, b| a.partial_cmp(b).unwrap());
    out
}

fn verify(
    want: &[(i64, i64, f64)],
    got: impl Iterator<Item = CooElem<i64, f64>>,
    what: &str,
) -> Result<()> {
    let mut got: Vec<(i64, i64, f64)> = got.map(|p| (p.row, p.col, p.val)).collect();
    got.sort_by(|a, b| a.partial_cmp(b).unwrap());
    ensure!(
        got == want,
        "decoded {what} does not match the input ({} vs {} entries)",
        got.len(),
        want.len()
    );
    Ok(())
}
