use thiserror::Error;

/// Errors raised while parsing, encoding, or decoding programs.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AssemblyError {
    /// Ill-formed assembly text or image line.
    #[error("Syntax Error: {msg} on line {line}.")]
    Syntax { msg: String, line: usize },

    /// The mnemonic matched but its operands are missing, unrecognized, or
    /// out of range.
    #[error("Syntax Error: Invalid argument ({msg}) on line {line}.")]
    InvalidArgument { msg: String, line: usize },

    /// An image word that is malformed or matches no known instruction.
    #[error("Invalid instruction \"{word}\" on line {line}.")]
    InvalidInstruction { word: String, line: usize },

    /// A branch or jump references a label the program never defines.
    #[error("Assembly Error: Label \"{label}\" not found on line {line}.")]
    LabelNotFound { label: String, line: usize },
}

/// A fault raised while the simulator is running.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("Simulation Error: {msg} at step {pc}.")]
pub struct SimulationError {
    pub msg: String,
    pub pc: i32,
}
