//! The simulator drives a program counter over a decoded instruction list,
//! executing each instruction against a register file and sparse memory.
//! `run` is meant to execute on a worker thread; the owner keeps a
//! [`KillSwitch`] and observes state after the runner halts.

use mips_model::image::decode_image;
use mips_model::{AssemblyError, Instruction, Memory, RegisterFile, SimulationError};
use std::convert::TryFrom;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

/// A MIPS simulator.
#[derive(Debug)]
pub struct Simulator {
    instructions: Vec<Instruction>,
    memory: Memory,
    regfile: RegisterFile,
    pc: i32,
    kill: Arc<AtomicBool>,
}

/// A handle the supervisor keeps to request cooperative termination of a
/// running simulation. The flag is checked at each instruction boundary.
#[derive(Clone, Debug)]
pub struct KillSwitch(Arc<AtomicBool>);

impl KillSwitch {
    pub fn kill(&self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

impl Simulator {
    pub fn new() -> Self {
        Simulator {
            instructions: Vec::new(),
            memory: Memory::new(),
            regfile: RegisterFile::new(),
            pc: 0,
            kill: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Decode a hex image, appending to any previously decoded
    /// instructions.
    pub fn decode(&mut self, image: &str) -> Result<(), AssemblyError> {
        self.instructions.extend(decode_image(image)?);
        Ok(())
    }

    /// A handle for killing this simulation from another thread.
    pub fn kill_switch(&self) -> KillSwitch {
        KillSwitch(self.kill.clone())
    }

    /// Run from PC 0 until the PC walks off the end of the program or the
    /// kill flag is raised. A PC outside the program that is not exactly
    /// one past the end is a simulation fault.
    pub fn run(&mut self) -> Result<(), SimulationError> {
        if self.instructions.is_empty() {
            return Ok(());
        }
        log::debug!("running {} instruction(s)", self.instructions.len());

        while !self.kill.load(Ordering::Relaxed) {
            let instruction = match usize::try_from(self.pc) {
                Ok(index) if index < self.instructions.len() => &self.instructions[index],
                _ => {
                    if self.pc == self.instructions.len() as i32 {
                        return Ok(()); // end of program
                    }
                    return Err(SimulationError {
                        msg: "No instructions here".to_string(),
                        pc: self.pc,
                    });
                }
            };

            self.pc = instruction.run(self.pc, &mut self.regfile, &mut self.memory);

            // Give the supervisor a chance to observe the kill flag
            thread::yield_now();
        }

        log::info!("simulation killed at step {}", self.pc);
        Ok(())
    }

    /// Seed or patch a memory word before (or between) runs.
    pub fn set_memory(&mut self, address: i32, value: i32) {
        self.memory.write(address, value);
    }

    pub fn get_memory(&self, address: i32) -> i32 {
        self.memory.read(address)
    }

    pub fn regfile(&self) -> &RegisterFile {
        &self.regfile
    }

    pub fn pc(&self) -> i32 {
        self.pc
    }
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mips_assembler::Assembler;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn assemble(source: &str) -> String {
        let mut assembler = Assembler::new();
        assembler.parse(source).unwrap();
        assembler.assemble().unwrap()
    }

    fn simulator_for(source: &str) -> Simulator {
        let mut simulator = Simulator::new();
        simulator.decode(&assemble(source)).unwrap();
        simulator
    }

    #[test]
    fn empty_program_terminates_immediately() {
        let mut simulator = Simulator::new();
        assert_eq!(simulator.run(), Ok(()));
        assert_eq!(simulator.pc(), 0);
    }

    #[test]
    fn straight_line_program_ends_one_past_the_last_step() {
        let mut simulator = simulator_for("\taddi\t$1, $0, 4\n\tsll\t$2, $1, 1\n");
        simulator.run().unwrap();
        assert_eq!(simulator.pc(), 2);
        assert_eq!(simulator.regfile().get(1), 4);
        assert_eq!(simulator.regfile().get(2), 8);
    }

    #[test]
    fn multiplication_by_repeated_addition() {
        let source = "\
; multiply memory[0] by memory[4], store the product at memory[8]
\tlw\t$1, 0($0)\t; multiplicand
\tlw\t$2, 4($0)\t; remaining additions
\tadd\t$3, $0, $0\t; product
loop:\tbeq\t$2, $0, done
\tadd\t$3, $3, $1
\taddi\t$2, $2, -1
\tj\tloop
done:\tsw\t$3, 8($0)
";
        let mut simulator = simulator_for(source);
        simulator.set_memory(0, 5);
        simulator.set_memory(4, 7);
        simulator.run().unwrap();
        assert_eq!(simulator.regfile().get(3), 35);
        assert_eq!(simulator.get_memory(8), 35);
        assert_eq!(simulator.pc(), 8);
    }

    #[test]
    fn jal_links_and_lands_on_the_label() {
        let source = "\
\taddi\t$1, $0, 1
\taddi\t$1, $0, 2
\taddi\t$1, $0, 3
\tjal\ttarget
\taddi\t$9, $0, 9
\taddi\t$9, $0, 9
\taddi\t$9, $0, 9
target:\taddi\t$5, $0, 5
";
        let mut simulator = simulator_for(source);
        simulator.run().unwrap();
        assert_eq!(simulator.regfile().get(31), 4);
        assert_eq!(simulator.regfile().get(5), 5);
        assert_eq!(simulator.regfile().get(9), 0);
        assert_eq!(simulator.pc(), 8);
    }

    #[test]
    fn register_zero_is_never_observable() {
        let mut simulator = simulator_for("\taddi\t$1, $0, 5\n\tadd\t$0, $1, $1\n");
        simulator.run().unwrap();
        assert_eq!(simulator.regfile().get(0), 0);
    }

    #[test]
    fn jumping_nowhere_is_a_fault() {
        let mut simulator = simulator_for("\tj\t100\n");
        assert_eq!(
            simulator.run(),
            Err(SimulationError {
                msg: "No instructions here".to_string(),
                pc: 100,
            })
        );
    }

    #[test]
    fn kill_stops_a_spinning_program() {
        let mut simulator = simulator_for("start:\tj\tstart\n");
        let switch = simulator.kill_switch();

        let handle = thread::spawn(move || {
            let result = simulator.run();
            (simulator, result)
        });
        thread::sleep(Duration::from_millis(50));
        switch.kill();

        let (simulator, result) = handle.join().unwrap();
        assert_eq!(result, Ok(()));
        assert_eq!(simulator.pc(), 0);
    }
}
