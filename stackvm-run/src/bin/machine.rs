//! `machine <instructions.bin> <data.bin> <input-schedule>` — loads a
//! linked program, drives the simulator's tick loop to halt, a
//! [`stackvm::SimError`], or a tick limit, and logs the final output
//! buffer. Grounded on `vex/src/main.rs`'s argument-group dispatch,
//! simplified to the spec's three fixed positional arguments, with
//! `tracing` in place of the teacher's bare `println!`.

use anyhow::{Context, Result};
use clap::Parser;
use stackvm::constants::DATA_MEMORY_SIZE;
use stackvm::{Machine, TickOutcome};
use stackvm_run::{loader, schedule};
use std::fs;
use std::process::ExitCode;

/// Runs a linked stack-language program on the register-machine
/// simulator.
#[derive(clap::Parser, Debug)]
#[command(name = "machine")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Instruction image, as written by `translator`
    instructions: std::path::PathBuf,

    /// Data image, as written by `translator`
    data: std::path::PathBuf,

    /// Input schedule file: one `<tick> <value>` pair per line
    schedule: std::path::PathBuf,

    /// Maximum number of ticks to run before giving up
    #[arg(long, default_value_t = 1_000_000)]
    max_ticks: u64,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    if args.verbose {
        tracing_subscriber::fmt().with_env_filter("stackvm_run=debug").init();
    }

    match run(&args) {
        Ok(code) => code,
        Err(err) => {
            tracing::error!("{err:#}");
            eprintln!("error: {err:#}");
            ExitCode::from(1)
        }
    }
}

fn run(args: &Args) -> Result<ExitCode> {
    let instructions_bytes =
        fs::read(&args.instructions).with_context(|| format!("reading {}", args.instructions.display()))?;
    let instruction_records = stackvm_lang::binfmt::read_records(&mut &instructions_bytes[..])
        .context("decoding instruction image")?;
    let instructions = loader::instructions_from_records(&instruction_records)
        .context("instruction image contains a word that does not decode to any instruction")?;

    let data_bytes = fs::read(&args.data).with_context(|| format!("reading {}", args.data.display()))?;
    let data_records = stackvm_lang::binfmt::read_records(&mut &data_bytes[..]).context("decoding data image")?;

    let schedule_text =
        fs::read_to_string(&args.schedule).with_context(|| format!("reading {}", args.schedule.display()))?;
    let entries = schedule::parse(&schedule_text).context("parsing input schedule")?;

    let mut machine = Machine::new(instructions, DATA_MEMORY_SIZE as u32);
    for record in &data_records {
        machine
            .load_data(record.address, record.value as i32)
            .with_context(|| format!("loading data word at address {}", record.address))?;
    }

    let mut pending = entries.into_iter().peekable();
    let mut tick_number: u64 = 1;

    loop {
        while let Some(entry) = pending.peek() {
            if entry.tick < tick_number {
                pending.next();
            } else {
                break;
            }
        }
        while let Some(entry) = pending.peek().copied() {
            if entry.tick != tick_number {
                break;
            }
            pending.next();
            tracing::debug!(tick = tick_number, value = entry.value, "interrupt requested");
            machine.request_interrupt(entry.value);
        }

        if tick_number > args.max_ticks {
            tracing::warn!(max_ticks = args.max_ticks, "tick limit exceeded; terminating simulation");
            break;
        }

        match machine.tick() {
            Ok(TickOutcome::Halted) => break,
            Ok(TickOutcome::Continue) => {}
            Err(err) => {
                tracing::error!(tick = tick_number, "{err}");
                eprintln!("simulation error at tick {tick_number}: {err}");
                return Ok(ExitCode::from(1));
            }
        }

        tick_number += 1;
    }

    tracing::info!(output = ?machine.output_buffer(), ticks = machine.tick_count(), "simulation finished");
    for value in machine.output_buffer() {
        println!("{value}");
    }

    Ok(ExitCode::SUCCESS)
}
