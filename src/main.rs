use std::fs::File;
use std::path::PathBuf;

use clap::Parser;
use memmap2::Mmap;
use rootcause::prelude::*;
use tracing_subscriber::EnvFilter;

use tmdecode::report::render_to_string;
use tmdecode::{DecodeOptions, ObjectErrorPolicy, decode_with};

/// Dump the contents of a TMD model file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Emit the decoded tree as JSON instead of the text listing
    #[clap(long)]
    json: bool,

    /// Decode objects in parallel
    #[clap(long)]
    parallel: bool,

    /// Leave out objects whose sections do not fit in the file instead of failing
    #[clap(long)]
    skip_bad_objects: bool,

    /// .tmd file
    path: PathBuf,
}

fn main() -> Result<(), Report> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let file = File::open(&args.path)
        .map_err(|e| rootcause::report!("Failed to open {}: {e}", args.path.display()))?;
    let mmap = unsafe { Mmap::map(&file) }
        .map_err(|e| rootcause::report!("Failed to map {}: {e}", args.path.display()))?;

    let object_errors = if args.skip_bad_objects {
        ObjectErrorPolicy::Skip
    } else {
        ObjectErrorPolicy::Abort
    };
    let options = DecodeOptions::builder()
        .object_errors(object_errors)
        .parallel(args.parallel)
        .build();

    let decoded = decode_with(&mmap[..], &options)
        .map_err(|e| rootcause::report!("Failed to decode {}: {e}", args.path.display()))?;

    if args.json {
        let json = serde_json::to_string_pretty(&decoded)
            .map_err(|e| rootcause::report!("Failed to serialize: {e}"))?;
        println!("{json}");
    } else {
        println!("-- TMD at path '{}' --", args.path.display());
        print!("{}", render_to_string(&decoded));
    }

    Ok(())
}
