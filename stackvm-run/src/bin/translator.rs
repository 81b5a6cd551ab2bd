//! `translator <source> <instructions> <data>` — runs the full
//! preprocess -> lex -> parse -> codegen -> encode pipeline over a
//! source file and writes the linked program. Grounded on
//! `vasm/src/main.rs`'s CLI shape, re-expressed with `clap`'s derive
//! API (the convention `isa-classifier` demonstrates) instead of the
//! teacher's `clap ~2.32` builder style.

use anyhow::{Context, Result};
use clap::Parser;
use stackvm::constants::DATA_AREA_START;
use stackvm_lang::{binfmt, preprocessor, translate};
use std::fs;
use std::path::{Path, PathBuf};

/// Translates a stack-language source file into a linked instruction
/// and data image.
#[derive(Parser, Debug)]
#[command(name = "translator")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Source file to translate
    source: PathBuf,

    /// Output path for the instruction image
    instructions: PathBuf,

    /// Output path for the data image
    data: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.verbose {
        tracing_subscriber::fmt().with_env_filter("stackvm_run=debug").init();
    }

    let raw_source = fs::read_to_string(&args.source)
        .with_context(|| format!("reading source file {}", args.source.display()))?;
    let source_dir = args.source.parent().unwrap_or_else(|| Path::new("."));

    let mut read_file = |path: &Path| fs::read_to_string(path);
    let expanded = preprocessor::preprocess(&raw_source, source_dir, &mut read_file)
        .context("preprocessing source")?;

    let output = translate(&expanded).context("translating source")?;
    tracing::info!(
        instructions = output.instructions.len(),
        data_words = output.data.len(),
        "translation succeeded"
    );

    let binary_output = args.instructions.extension().map(|ext| ext == "bin").unwrap_or(false);

    if binary_output {
        let mut instructions_file = fs::File::create(&args.instructions)
            .with_context(|| format!("creating {}", args.instructions.display()))?;
        binfmt::write_instructions(&mut instructions_file, &output.instructions)
            .context("writing instruction binary")?;

        let hex_path = args.instructions.with_extension("hex");
        let dump = binfmt::hex_dump(&output.instructions).context("rendering hex dump")?;
        fs::write(&hex_path, dump).with_context(|| format!("writing {}", hex_path.display()))?;

        let mut data_file = fs::File::create(&args.data).with_context(|| format!("creating {}", args.data.display()))?;
        binfmt::write_data(&mut data_file, &output.data, DATA_AREA_START).context("writing data binary")?;
    } else {
        let instructions_json = binfmt::instructions_to_json(&output.instructions).context("rendering instruction JSON")?;
        fs::write(&args.instructions, instructions_json)
            .with_context(|| format!("writing {}", args.instructions.display()))?;

        let data_json = binfmt::data_to_json(&output.data, DATA_AREA_START).context("rendering data JSON")?;
        fs::write(&args.data, data_json).with_context(|| format!("writing {}", args.data.display()))?;
    }

    Ok(())
}
