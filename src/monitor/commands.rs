use std::fmt;

use clap::{Parser, Subcommand};
use clap_num::maybe_hex;

use crate::u4;

/// The monitor's command grammar.
///
/// `multicall` makes every input line parse as `command args...` with no
/// binary-name prefix, which is exactly the shape of a REPL line.
#[derive(Parser)]
#[command(multicall = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Clone)]
pub enum Command {
    /// Execute until a breakpoint, a key wait, or the step budget runs out.
    #[command(visible_alias = "r")]
    Run {
        /// Maximum number of steps before control returns to the monitor
        #[arg(default_value_t = 100_000, value_parser = maybe_hex::<u64>)]
        budget: u64,
    },

    /// Execute a fixed number of instructions.
    #[command(visible_alias = "s")]
    Step {
        #[arg(default_value_t = 1, value_parser = maybe_hex::<u64>)]
        count: u64,
    },

    /// Show registers, timers and machine status.
    Regs,

    /// Hex-dump machine memory.
    #[command(visible_alias = "m")]
    Mem {
        #[arg(default_value = "0x200", value_parser = maybe_hex::<u16>)]
        start: u16,
        #[arg(default_value = "64", value_parser = maybe_hex::<u16>)]
        len: u16,
    },

    /// Disassemble instruction words, starting at the program counter by
    /// default.
    #[command(visible_alias = "d")]
    Disasm {
        #[arg(value_parser = maybe_hex::<u16>)]
        start: Option<u16>,
        #[arg(default_value = "16", value_parser = maybe_hex::<u16>)]
        len: u16,
    },

    /// Render the screen as text and acknowledge the redraw flag.
    #[command(visible_alias = "sc")]
    Screen,

    #[command(visible_alias = "b")]
    Breakpoint {
        #[command(subcommand)]
        action: BreakpointAction,
    },

    /// Press or release a keypad key.
    #[command(visible_alias = "k")]
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },

    /// Write a register, the index register, or the program counter.
    Set {
        #[arg(value_parser = parse_set_target)]
        target: SetTarget,
        #[arg(value_parser = maybe_hex::<u16>)]
        value: u16,
    },

    /// Reload the ROM into a fresh machine.
    Reset,

    #[command(visible_alias = "q")]
    Quit,
}

#[derive(Subcommand, Clone)]
pub enum BreakpointAction {
    #[command(visible_alias = "s")]
    Set {
        #[arg(value_parser = maybe_hex::<u16>)]
        addr: u16,
    },

    #[command(visible_alias = "c")]
    Clear {
        #[arg(value_parser = maybe_hex::<u16>)]
        addr: u16,
    },

    #[command(visible_alias = "l")]
    List,

    #[command(visible_alias = "ca")]
    ClearAll,
}

#[derive(Subcommand, Clone)]
pub enum KeyAction {
    #[command(visible_alias = "d")]
    Down {
        #[arg(value_parser = parse_key)]
        key: u4,
    },

    #[command(visible_alias = "u")]
    Up {
        #[arg(value_parser = parse_key)]
        key: u4,
    },
}

#[derive(Clone)]
pub enum SetTarget {
    V(u4),
    I,
    Pc,
}

#[derive(Debug)]
pub enum CommandResult {
    Ok,
    Ran { steps: u64, stop: StopReason },
    Breakpoints(Vec<u16>),
    Report(String),
    Quit,
}

/// Why a `run` handed control back.
#[derive(Debug)]
pub enum StopReason {
    BudgetExhausted,
    Breakpoint(u16),
    AwaitingKey,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::BudgetExhausted => write!(f, "step budget exhausted"),
            StopReason::Breakpoint(addr) => write!(f, "hit breakpoint at {addr:#06X}"),
            StopReason::AwaitingKey => write!(f, "machine is waiting for a key"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Error while executing cpu instruction: {0}")]
    Chip8Error(#[from] crate::chip8::Chip8Error),
    #[error("Value out of range")]
    ValueOutOfRange,
}

fn parse_set_target(s: &str) -> Result<SetTarget, String> {
    let lower = s.to_lowercase();

    match lower.as_str() {
        "index" | "i" => Ok(SetTarget::I),
        "pc" => Ok(SetTarget::Pc),

        _ if lower.starts_with('v') => {
            let hex_str = &lower[1..];
            match u8::from_str_radix(hex_str, 16) {
                Ok(val) if val < 16 => Ok(SetTarget::V(u4::new(val))),
                _ => Err(format!("Invalid register: '{}'", s)),
            }
        }

        _ => Err(format!("Unknown set target: '{}'", s)),
    }
}

fn parse_key(s: &str) -> Result<u4, String> {
    let digits = s.strip_prefix("0x").unwrap_or(s);

    match u8::from_str_radix(digits, 16) {
        Ok(val) if val < 16 => Ok(u4::new(val)),
        _ => Err(format!("Invalid key (expected 0-F): '{}'", s)),
    }
}
