use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use chip8_vm::monitor::{Cli, Command, CommandResult, Executor};

/// Headless CHIP-8 machine monitor.
///
/// Loads a ROM and drops into a prompt for stepping, breakpoints, register
/// and memory inspection, disassembly and keypad input. Type `help` at the
/// prompt for the command list; an empty line repeats the last command.
#[derive(Parser, Debug)]
#[command(about)]
struct Args {
    /// Path to the CHIP-8 ROM file
    rom_path: PathBuf,

    /// Record the historical instruction semantics toggle for ROMs that
    /// expect it
    #[arg(long)]
    old_instructions: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();
    let rom = std::fs::read(&args.rom_path).context("Failed to read ROM file")?;

    let mut executor = Executor::new(&rom, args.old_instructions)
        .context("Failed to load ROM into CHIP-8 memory")?;

    let stdin = io::stdin();
    let mut last_command: Option<Command> = None;

    loop {
        print!("(c8) ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }

        // An empty line repeats the previous command, gdb style
        let command = if line.trim().is_empty() {
            match &last_command {
                Some(command) => command.clone(),
                None => continue,
            }
        } else {
            match Cli::try_parse_from(line.split_whitespace()) {
                Ok(cli) => cli.command,
                Err(err) => {
                    // clap renders its own usage and help output
                    let _ = err.print();
                    continue;
                }
            }
        };
        last_command = Some(command.clone());

        match executor.execute(command) {
            Ok(CommandResult::Ok) => {}
            Ok(CommandResult::Ran { steps, stop }) => {
                println!("{steps} steps; {stop}");
            }
            Ok(CommandResult::Breakpoints(breakpoints)) => {
                if breakpoints.is_empty() {
                    println!("no breakpoints set");
                } else {
                    for addr in breakpoints {
                        println!("{addr:#06X}");
                    }
                }
            }
            Ok(CommandResult::Report(text)) => println!("{text}"),
            Ok(CommandResult::Quit) => break,
            Err(err) => println!("{err}"),
        }
    }

    Ok(())
}
