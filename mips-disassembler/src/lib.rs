//! The disassembler decodes a hex image into the instruction list and
//! renders it back to assembly text. Labels do not survive assembly, so
//! branch and jump targets come out numeric.

use mips_model::image::decode_image;
use mips_model::{AssemblyError, Instruction};

/// A MIPS disassembler.
#[derive(Debug, Default)]
pub struct Disassembler {
    instructions: Vec<Instruction>,
}

impl Disassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a hex image, appending to any previously decoded
    /// instructions.
    pub fn decode(&mut self, image: &str) -> Result<(), AssemblyError> {
        self.instructions.extend(decode_image(image)?);
        log::debug!("decoded {} instruction(s)", self.instructions.len());
        Ok(())
    }

    /// Render the decoded instructions as assembly source, one statement
    /// per line.
    pub fn disassemble(&self) -> String {
        let mut source = String::new();
        for instruction in &self.instructions {
            source.push_str(&instruction.to_code());
            source.push('\n');
        }
        source
    }
}
