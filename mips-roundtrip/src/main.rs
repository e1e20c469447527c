use env_logger::Env;
use mips_assembler::Assembler;
use mips_disassembler::Disassembler;
use mips_simulator::Simulator;
use std::error::Error;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;
use structopt::StructOpt;

/// How long the supervisor waits before asking the simulation to stop
const SOFT_WAIT: Duration = Duration::from_secs(1);
/// How long the supervisor waits after raising the kill flag
const HARD_WAIT: Duration = Duration::from_secs(3);

#[derive(StructOpt)]
struct CliArgs {
    /// Assembly source file
    #[structopt(parse(from_os_str), default_value = "multiplication.s")]
    file_path: PathBuf,
}

fn main() -> Result<(), Box<dyn Error>> {
    // Setup logging and parse CLI args
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()))
        .init();
    let args = CliArgs::from_args();

    let source = fs::read_to_string(&args.file_path)?;
    println!("===== Loaded File =====");
    println!("{}", source);

    // Assemble
    let mut assembler = Assembler::new();
    assembler.parse(&source)?;
    let image = assembler.assemble()?;
    println!("===== Assembly Result =====");
    println!("{}", image);

    // Disassemble
    let mut disassembler = Disassembler::new();
    disassembler.decode(&image)?;
    let disassembly = disassembler.disassemble();
    println!("===== Disassembly Result =====");
    println!("{}", disassembly);

    // Re-assemble the disassembly; labels are gone but the image must match
    let mut reassembler = Assembler::new();
    reassembler.parse(&disassembly)?;
    let reassembled = reassembler.assemble()?;
    println!("===== Re-Assembly Result =====");
    println!("{}", reassembled);

    // Simulate on a worker thread with a two-phase timeout
    let mut simulator = Simulator::new();
    simulator.decode(&image)?;
    simulator.set_memory(0, 5);
    simulator.set_memory(4, 7);

    let switch = simulator.kill_switch();
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        let outcome = simulator.run();
        // The supervisor may have given up waiting
        let _ = sender.send((simulator, outcome));
    });

    let (simulator, outcome) = match receiver.recv_timeout(SOFT_WAIT) {
        Ok(done) => done,
        Err(RecvTimeoutError::Timeout) => {
            log::warn!(
                "Simulation is running, will be killed in {} seconds...",
                HARD_WAIT.as_secs()
            );
            switch.kill();
            receiver.recv_timeout(HARD_WAIT)?
        }
        Err(disconnected) => return Err(disconnected.into()),
    };
    outcome?;

    println!("===== Simulation Result =====");
    println!("PC = {} * 4", simulator.pc());
    let regfile = simulator.regfile();
    for i in 0..regfile.size() {
        println!("Regfile[{}] = {}", i, regfile.get(i as i32));
    }

    Ok(())
}
