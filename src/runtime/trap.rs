use super::{HaltReason, RunState};
use crate::{console::Console, object::MEMORY_MAX, symbol::Register, symbol::TrapVect};

/// Value placed in R0 when a blocking read finds no more input.
const END_OF_INPUT: u16 = 0xFFFF;

impl RunState {
    pub(super) fn trap(&mut self, vect: u8, console: &mut dyn Console) {
        self.set_reg(Register::R7, self.pc);

        let Some(trap) = TrapVect::from_vector(vect) else {
            if self.features.strict_traps {
                self.fault(HaltReason::UnknownTrap(vect), console);
            }
            return;
        };

        match trap {
            TrapVect::Getc => {
                let val = console.read_byte().map_or(END_OF_INPUT, u16::from);
                self.set_reg(Register::R0, val);
                self.set_flags(val);
            }
            TrapVect::Out => {
                console.write_byte((self.reg(Register::R0) & 0xFF) as u8);
                console.flush();
            }
            TrapVect::Puts => {
                let start = self.reg(Register::R0);
                for addr in string_addrs(start) {
                    let chr = self.mem.peek(addr);
                    if chr == 0 {
                        break;
                    }
                    console.write_byte((chr & 0xFF) as u8);
                }
                console.flush();
            }
            TrapVect::In => {
                console.write_str("Enter a character: ");
                console.flush();
                let val = match console.read_byte() {
                    Some(byte) => {
                        console.write_byte(byte);
                        console.flush();
                        byte as u16
                    }
                    None => END_OF_INPUT,
                };
                self.set_reg(Register::R0, val);
                self.set_flags(val);
            }
            TrapVect::Putsp => {
                let start = self.reg(Register::R0);
                for addr in string_addrs(start) {
                    let word = self.mem.peek(addr);
                    let [low, high] = word.to_le_bytes();
                    if low == 0 {
                        break;
                    }
                    console.write_byte(low);
                    if high != 0 {
                        console.write_byte(high);
                    }
                }
                console.flush();
            }
            TrapVect::Halt => {
                console.write_str("HALT\n");
                console.flush();
                self.halted = Some(HaltReason::Halt);
            }
        }
    }
}

/// Addresses of a string starting at `start`, visiting each word at most once.
fn string_addrs(start: u16) -> impl Iterator<Item = u16> {
    (0..MEMORY_MAX).map(move |i| start.wrapping_add(i as u16))
}

#[cfg(test)]
mod tests {
    use crate::console::BufferConsole;
    use crate::features::Features;
    use crate::runtime::{HaltReason, RunState, StepResult, DEFAULT_PC};
    use crate::symbol::Register::*;

    fn machine(features: Features, words: &[u16]) -> RunState {
        let mut state = RunState::with_features(features);
        state.memory_mut().write_block(DEFAULT_PC, words);
        state
    }

    #[test]
    fn trap_saves_return_address() {
        let mut state = machine(Features::default(), &[0x1021, 0xF021]);
        let mut console = BufferConsole::new();
        state.step(&mut console);
        state.step(&mut console);
        assert_eq!(state.reg(R7), 0x3002);
        assert_eq!(console.output(), &[0x01]);
    }

    #[test]
    fn getc_sets_flags() {
        let mut state = machine(Features::default(), &[0xF020, 0xF020]);
        let mut console = BufferConsole::with_input("A");
        state.step(&mut console);
        assert_eq!(state.reg(R0), b'A' as u16);
        assert_eq!(state.flags(), 0b001);
        assert!(console.output().is_empty());

        // End of input
        state.step(&mut console);
        assert_eq!(state.reg(R0), 0xFFFF);
        assert_eq!(state.flags(), 0b100);
    }

    #[test]
    fn in_prompts_and_echoes() {
        let mut state = machine(Features::default(), &[0xF023]);
        let mut console = BufferConsole::with_input("q");
        state.step(&mut console);
        assert_eq!(console.output_str(), "Enter a character: q");
        assert_eq!(state.reg(R0), b'q' as u16);
    }

    #[test]
    fn puts_writes_low_bytes() {
        let mut state = machine(Features::default(), &[0xF022]);
        state.memory_mut().write_block(0x4000, &[0x0048, 0xFF69, 0x0000, 0x0021]);
        state.set_reg(R0, 0x4000);
        let mut console = BufferConsole::new();
        state.step(&mut console);
        assert_eq!(console.output(), b"Hi");
    }

    #[test]
    fn putsp_unpacks_two_per_word() {
        let mut state = machine(Features::default(), &[0xF024]);
        // "abc" then a word whose low byte ends the string
        state
            .memory_mut()
            .write_block(0x4000, &[0x6261, 0x0063, 0x6400, 0x0065]);
        state.set_reg(R0, 0x4000);
        let mut console = BufferConsole::new();
        state.step(&mut console);
        assert_eq!(console.output_str(), "abc");
    }

    #[test]
    fn halt_message() {
        let mut state = machine(Features::default(), &[0xF025]);
        let mut console = BufferConsole::new();
        assert_eq!(state.step(&mut console), StepResult::Halted);
        assert_eq!(console.output_str(), "HALT\n");
        assert_eq!(state.halt_reason(), Some(HaltReason::Halt));
    }

    #[test]
    fn unknown_vector_is_ignored() {
        let mut state = machine(Features::default(), &[0xF030, 0x1021]);
        let mut console = BufferConsole::new();
        assert_eq!(state.step(&mut console), StepResult::Running);
        assert_eq!(state.reg(R7), 0x3001);
        state.step(&mut console);
        assert_eq!(state.reg(R0), 1);
        assert!(console.output().is_empty());
    }

    #[test]
    fn unknown_vector_faults_when_strict() {
        let features = Features {
            strict_traps: true,
            ..Features::default()
        };
        let mut state = machine(features, &[0xF030]);
        let mut console = BufferConsole::new();
        assert_eq!(state.step(&mut console), StepResult::Halted);
        assert_eq!(state.halt_reason(), Some(HaltReason::UnknownTrap(0x30)));
        assert!(console.output_str().contains("UNKNOWN TRAP VECTOR X30"));
    }
}
