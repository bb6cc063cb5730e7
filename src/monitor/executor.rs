use std::collections::HashSet;
use std::fmt::Write;

use super::commands::{
    BreakpointAction, Command, CommandError, CommandResult, KeyAction, SetTarget, StopReason,
};
use crate::chip8::{Chip8, Chip8Error, Opcode, SCREEN_HEIGHT, SCREEN_WIDTH};

/// Executes monitor commands against an owned machine.
pub struct Executor {
    chip8: Chip8,
    rom: Vec<u8>,
    old_instructions: bool,
    breakpoints: HashSet<u16>,
}

impl Executor {
    pub fn new(rom: &[u8], old_instructions: bool) -> Result<Self, Chip8Error> {
        let mut executor = Self {
            chip8: Chip8::new(),
            rom: rom.to_vec(),
            old_instructions,
            breakpoints: HashSet::new(),
        };
        executor.reset()?;

        Ok(executor)
    }

    pub fn execute(&mut self, command: Command) -> Result<CommandResult, CommandError> {
        match command {
            Command::Run { budget } => self.execute_run(budget),
            Command::Step { count } => self.execute_step(count),
            Command::Regs => Ok(CommandResult::Report(self.format_regs())),
            Command::Mem { start, len } => Ok(CommandResult::Report(self.format_mem(start, len))),
            Command::Disasm { start, len } => {
                let start = start.unwrap_or(self.chip8.pc);
                Ok(CommandResult::Report(self.format_disasm(start, len)))
            }
            Command::Screen => {
                let report = self.format_screen();
                self.chip8.clear_redraw();
                Ok(CommandResult::Report(report))
            }
            Command::Breakpoint { action } => self.handle_breakpoint(action),
            Command::Key { action } => {
                match action {
                    KeyAction::Down { key } => self.chip8.set_key(key, true),
                    KeyAction::Up { key } => self.chip8.set_key(key, false),
                }
                Ok(CommandResult::Ok)
            }
            Command::Set { target, value } => self.handle_set(target, value),
            Command::Reset => {
                self.reset()?;
                Ok(CommandResult::Ok)
            }
            Command::Quit => Ok(CommandResult::Quit),
        }
    }

    pub fn chip8_ref(&self) -> &Chip8 {
        &self.chip8
    }

    pub fn chip8_mut(&mut self) -> &mut Chip8 {
        &mut self.chip8
    }

    fn reset(&mut self) -> Result<(), Chip8Error> {
        let mut chip8 = Chip8::new();
        chip8.set_old_instructions(self.old_instructions);
        chip8.load(&self.rom)?;
        self.chip8 = chip8;

        Ok(())
    }

    fn execute_run(&mut self, budget: u64) -> Result<CommandResult, CommandError> {
        for steps in 0..budget {
            self.chip8.step()?;

            if self.chip8.awaiting_key.is_some() {
                return Ok(CommandResult::Ran {
                    steps: steps + 1,
                    stop: StopReason::AwaitingKey,
                });
            }

            if self.breakpoints.contains(&self.chip8.pc) {
                return Ok(CommandResult::Ran {
                    steps: steps + 1,
                    stop: StopReason::Breakpoint(self.chip8.pc),
                });
            }
        }

        Ok(CommandResult::Ran {
            steps: budget,
            stop: StopReason::BudgetExhausted,
        })
    }

    fn execute_step(&mut self, count: u64) -> Result<CommandResult, CommandError> {
        for _ in 0..count {
            self.chip8.step()?;
        }

        Ok(CommandResult::Ok)
    }

    fn handle_breakpoint(
        &mut self,
        action: BreakpointAction,
    ) -> Result<CommandResult, CommandError> {
        match action {
            BreakpointAction::Set { addr } => {
                self.breakpoints.insert(addr);
            }
            BreakpointAction::Clear { addr } => {
                self.breakpoints.remove(&addr);
            }
            BreakpointAction::ClearAll => {
                self.breakpoints.clear();
            }
            BreakpointAction::List => {
                let mut bps: Vec<u16> = self.breakpoints.iter().copied().collect();
                bps.sort();
                return Ok(CommandResult::Breakpoints(bps));
            }
        };

        Ok(CommandResult::Ok)
    }

    fn handle_set(&mut self, target: SetTarget, value: u16) -> Result<CommandResult, CommandError> {
        match target {
            SetTarget::V(reg) => {
                let byte = u8::try_from(value).map_err(|_| CommandError::ValueOutOfRange)?;
                self.chip8.v[reg] = byte;
            }
            SetTarget::I => {
                self.chip8.i = value;
            }
            SetTarget::Pc => {
                self.chip8.pc = value;
            }
        }

        Ok(CommandResult::Ok)
    }

    fn format_regs(&self) -> String {
        let c = &self.chip8;
        let mut out = String::new();

        let _ = writeln!(
            out,
            "PC {:#06X}  I {:#06X}  SP {}  DT {}  ST {}",
            c.pc, c.i, c.sp, c.delay_timer, c.sound_timer
        );
        for row in 0..2 {
            for reg in (row * 8)..(row * 8 + 8) {
                let _ = write!(out, "V{reg:X} {:02X}  ", c.v[reg]);
            }
            let _ = writeln!(out);
        }
        let _ = write!(
            out,
            "awaiting key: {}  redraw pending: {}",
            c.awaiting_key.is_some(),
            c.redraw_pending()
        );

        out
    }

    fn format_mem(&self, start: u16, len: u16) -> String {
        let start = start as usize;
        let end = (start + len as usize).min(self.chip8.memory.len());
        let mut out = String::new();

        for row_start in (start..end).step_by(16) {
            let _ = write!(out, "{row_start:#06X} ");
            for addr in row_start..(row_start + 16).min(end) {
                let _ = write!(out, " {:02X}", self.chip8.memory[addr]);
            }
            let _ = writeln!(out);
        }

        out.trim_end().to_string()
    }

    fn format_disasm(&self, start: u16, len: u16) -> String {
        let mut out = String::new();

        for index in 0..len {
            let addr = start as usize + index as usize * 2;
            let Some(bytes) = self.chip8.memory.get(addr..addr + 2) else {
                break;
            };
            let word = u16::from_be_bytes([bytes[0], bytes[1]]);
            let marker = if addr as u16 == self.chip8.pc { "=>" } else { "  " };

            let _ = writeln!(
                out,
                "{marker} {addr:#06X}  {word:04X}  {}",
                Opcode::decode(word)
            );
        }

        out.trim_end().to_string()
    }

    fn format_screen(&self) -> String {
        let mut out = String::new();

        for y in 0..SCREEN_HEIGHT {
            for x in 0..SCREEN_WIDTH {
                out.push(if self.chip8.get_pixel(x, y) { '#' } else { '.' });
            }
            out.push('\n');
        }

        out.trim_end().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn executor(rom: &[u8]) -> Executor {
        Executor::new(rom, false).unwrap()
    }

    #[test]
    fn step_command_advances_the_machine() {
        // LD V0, 0x42
        let mut executor = executor(&[0x60, 0x42]);

        executor.execute(Command::Step { count: 1 }).unwrap();

        assert_eq!(executor.chip8_ref().pc, 0x202);
        assert_eq!(executor.chip8_ref().v[0], 0x42);
    }

    #[test]
    fn run_stops_at_a_breakpoint() {
        // LD V0, 1 / LD V1, 2 / JP 0x204
        let mut executor = executor(&[0x60, 0x01, 0x61, 0x02, 0x12, 0x04]);
        executor
            .execute(Command::Breakpoint {
                action: BreakpointAction::Set { addr: 0x204 },
            })
            .unwrap();

        let result = executor.execute(Command::Run { budget: 100 }).unwrap();

        match result {
            CommandResult::Ran {
                steps,
                stop: StopReason::Breakpoint(addr),
            } => {
                assert_eq!(steps, 2);
                assert_eq!(addr, 0x204);
            }
            _ => panic!("expected a breakpoint stop"),
        }
    }

    #[test]
    fn run_hands_control_back_on_a_key_wait() {
        // LD V0, K
        let mut executor = executor(&[0xF0, 0x0A]);

        let result = executor.execute(Command::Run { budget: 100 }).unwrap();

        assert!(matches!(
            result,
            CommandResult::Ran {
                steps: 1,
                stop: StopReason::AwaitingKey
            }
        ));

        // Feed a key and the program completes the wait
        executor
            .execute(Command::Key {
                action: KeyAction::Down {
                    key: crate::u4::new(7),
                },
            })
            .unwrap();
        executor.execute(Command::Step { count: 1 }).unwrap();
        assert_eq!(executor.chip8_ref().v[0], 7);
    }

    #[test]
    fn set_rejects_values_too_wide_for_a_register() {
        let mut executor = executor(&[0x60, 0x00]);

        let err = executor
            .execute(Command::Set {
                target: SetTarget::V(crate::u4::new(3)),
                value: 0x100,
            })
            .unwrap_err();

        assert!(matches!(err, CommandError::ValueOutOfRange));
    }

    #[test]
    fn reset_reloads_the_rom_from_scratch() {
        let mut executor = executor(&[0x60, 0x42]);
        executor.execute(Command::Step { count: 1 }).unwrap();
        assert_eq!(executor.chip8_ref().v[0], 0x42);

        executor.execute(Command::Reset).unwrap();

        assert_eq!(executor.chip8_ref().pc, 0x200);
        assert_eq!(executor.chip8_ref().v[0], 0);
    }

    #[test]
    fn disasm_marks_the_current_instruction() {
        let executor = executor(&[0x60, 0x42, 0x12, 0x00]);

        let listing = executor.format_disasm(0x200, 2);

        assert!(listing.contains("=> 0x0200  6042  LD V0, 0x42"));
        assert!(listing.contains("   0x0202  1200  JP 0x200"));
    }
}
