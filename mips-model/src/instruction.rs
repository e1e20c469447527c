use crate::bits::{
    fit_signed, is_integer_form, parse_int, sign_extend, word_from_hex, word_to_hex, zero_extend,
};
use crate::constants::{
    register_number, FUNCTION_ADD, FUNCTION_AND, FUNCTION_JR, FUNCTION_OR, FUNCTION_SLL,
    FUNCTION_SRA, FUNCTION_SRL, FUNCTION_SUB, FUNCTION_XOR, OP_ADDI, OP_ANDI, OP_BEQ, OP_BNE,
    OP_J, OP_JAL, OP_LUI, OP_LW, OP_ORI, OP_R_TYPE, OP_SW, OP_XORI, REG_RA,
};
use crate::error::AssemblyError;
use crate::memory::Memory;
use crate::registers::RegisterFile;
use either::Either;
use std::collections::HashMap;

/// The supported instruction kinds, in decode precedence order: when an
/// opcode-0 word carries a function code no R-type claims, the last opcode-0
/// entry wins.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Kind {
    Add,
    Sub,
    And,
    Or,
    Xor,
    Sll,
    Srl,
    Sra,
    Jr,
    Addi,
    Andi,
    Ori,
    Xori,
    Lw,
    Sw,
    Beq,
    Bne,
    Lui,
    J,
    Jal,
}

/// The three MIPS instruction layouts.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Form {
    Register,
    Immediate,
    Jump,
}

impl Kind {
    pub const ALL: [Kind; 20] = [
        Kind::Add,
        Kind::Sub,
        Kind::And,
        Kind::Or,
        Kind::Xor,
        Kind::Sll,
        Kind::Srl,
        Kind::Sra,
        Kind::Jr,
        Kind::Addi,
        Kind::Andi,
        Kind::Ori,
        Kind::Xori,
        Kind::Lw,
        Kind::Sw,
        Kind::Beq,
        Kind::Bne,
        Kind::Lui,
        Kind::J,
        Kind::Jal,
    ];

    /// Look up a kind by its mnemonic, case-insensitively.
    pub fn from_mnemonic(mnemonic: &str) -> Option<Kind> {
        Kind::ALL
            .iter()
            .find(|kind| kind.mnemonic().eq_ignore_ascii_case(mnemonic))
            .copied()
    }

    pub fn mnemonic(&self) -> &'static str {
        match self {
            Kind::Add => "add",
            Kind::Sub => "sub",
            Kind::And => "and",
            Kind::Or => "or",
            Kind::Xor => "xor",
            Kind::Sll => "sll",
            Kind::Srl => "srl",
            Kind::Sra => "sra",
            Kind::Jr => "jr",
            Kind::Addi => "addi",
            Kind::Andi => "andi",
            Kind::Ori => "ori",
            Kind::Xori => "xori",
            Kind::Lw => "lw",
            Kind::Sw => "sw",
            Kind::Beq => "beq",
            Kind::Bne => "bne",
            Kind::Lui => "lui",
            Kind::J => "j",
            Kind::Jal => "jal",
        }
    }

    pub fn opcode(&self) -> u32 {
        match self {
            Kind::Add
            | Kind::Sub
            | Kind::And
            | Kind::Or
            | Kind::Xor
            | Kind::Sll
            | Kind::Srl
            | Kind::Sra
            | Kind::Jr => OP_R_TYPE,
            Kind::Addi => OP_ADDI,
            Kind::Andi => OP_ANDI,
            Kind::Ori => OP_ORI,
            Kind::Xori => OP_XORI,
            Kind::Lw => OP_LW,
            Kind::Sw => OP_SW,
            Kind::Beq => OP_BEQ,
            Kind::Bne => OP_BNE,
            Kind::Lui => OP_LUI,
            Kind::J => OP_J,
            Kind::Jal => OP_JAL,
        }
    }

    /// The ALU function code; `None` for non-R-type kinds.
    pub fn function(&self) -> Option<u32> {
        match self {
            Kind::Add => Some(FUNCTION_ADD),
            Kind::Sub => Some(FUNCTION_SUB),
            Kind::And => Some(FUNCTION_AND),
            Kind::Or => Some(FUNCTION_OR),
            Kind::Xor => Some(FUNCTION_XOR),
            Kind::Sll => Some(FUNCTION_SLL),
            Kind::Srl => Some(FUNCTION_SRL),
            Kind::Sra => Some(FUNCTION_SRA),
            Kind::Jr => Some(FUNCTION_JR),
            _ => None,
        }
    }

    pub fn form(&self) -> Form {
        match self {
            Kind::Add
            | Kind::Sub
            | Kind::And
            | Kind::Or
            | Kind::Xor
            | Kind::Sll
            | Kind::Srl
            | Kind::Sra
            | Kind::Jr => Form::Register,
            Kind::Addi
            | Kind::Andi
            | Kind::Ori
            | Kind::Xori
            | Kind::Lw
            | Kind::Sw
            | Kind::Beq
            | Kind::Bne
            | Kind::Lui => Form::Immediate,
            Kind::J | Kind::Jal => Form::Jump,
        }
    }
}

/// A single MIPS instruction: the kind, its source location, and the operand
/// slots relevant to its form. A branch or jump parsed from a symbolic
/// target keeps the label in `jumpto` until encoding resolves it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instruction {
    kind: Kind,
    line_no: usize,
    step_no: usize,
    rs: i32,
    rt: i32,
    rd: i32,
    sa: i32,
    immediate: i32,
    address: i32,
    jumpto: Option<String>,
}

impl Instruction {
    /// Create an instruction with all operand slots zeroed. Slots are filled
    /// by `parse_args`.
    pub fn new(kind: Kind, line_no: usize, step_no: usize) -> Self {
        Instruction {
            kind,
            line_no,
            step_no,
            rs: 0,
            rt: 0,
            rd: 0,
            sa: 0,
            immediate: 0,
            address: 0,
            jumpto: None,
        }
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// Decode an instruction from its eight-hex-digit image word.
    pub fn decode(hex: &str, line_no: usize, step_no: usize) -> Result<Self, AssemblyError> {
        let invalid = || AssemblyError::InvalidInstruction {
            word: hex.to_string(),
            line: line_no,
        };
        let word = word_from_hex(hex).ok_or_else(invalid)?;
        let opcode = word >> 26;
        let function = word & 0x3F;

        // Last match in declaration order wins. An opcode-0 word whose
        // function code no R-type claims still decodes as the last opcode-0
        // entry.
        let mut exact = None;
        let mut opcode_only = None;
        for &kind in Kind::ALL.iter() {
            if kind.opcode() != opcode {
                continue;
            }
            opcode_only = Some(kind);
            if kind.function().map_or(true, |f| f == function) {
                exact = Some(kind);
            }
        }
        let kind = exact.or(opcode_only).ok_or_else(invalid)?;

        let mut instruction = Instruction::new(kind, line_no, step_no);
        match kind.form() {
            Form::Register => {
                instruction.rs = ((word >> 21) & 0x1F) as i32;
                instruction.rt = ((word >> 16) & 0x1F) as i32;
                instruction.rd = ((word >> 11) & 0x1F) as i32;
                instruction.sa = ((word >> 6) & 0x1F) as i32;
            }
            Form::Immediate => {
                instruction.rs = ((word >> 21) & 0x1F) as i32;
                instruction.rt = ((word >> 16) & 0x1F) as i32;
                instruction.immediate = sign_extend((word & 0xFFFF) as i32, 16);
            }
            Form::Jump => {
                instruction.address = sign_extend((word & 0x03FF_FFFF) as i32, 26);
            }
        }
        Ok(instruction)
    }

    /// Fill the operand slots from the comma-separated argument list of an
    /// assembly statement.
    pub fn parse_args(&mut self, args: &[&str]) -> Result<(), AssemblyError> {
        match self.kind {
            Kind::Add | Kind::Sub | Kind::And | Kind::Or | Kind::Xor => {
                self.expect_args(args, 3)?;
                self.rd = self.register(args[0])?;
                self.rs = self.register(args[1])?;
                self.rt = self.register(args[2])?;
            }
            Kind::Sll | Kind::Srl | Kind::Sra => {
                self.expect_args(args, 3)?;
                self.rd = self.register(args[0])?;
                self.rt = self.register(args[1])?;
                self.sa = self.immediate_operand(args[2], 5)?;
            }
            Kind::Jr => {
                self.expect_args(args, 1)?;
                self.rs = self.register(args[0])?;
            }
            Kind::Addi | Kind::Andi | Kind::Ori | Kind::Xori => {
                self.expect_args(args, 3)?;
                self.rt = self.register(args[0])?;
                self.rs = self.register(args[1])?;
                self.immediate = self.immediate_operand(args[2], 16)?;
            }
            Kind::Lw | Kind::Sw => {
                self.expect_args(args, 2)?;
                self.rt = self.register(args[0])?;
                let (immediate, rs) = self.memory_operand(args[1])?;
                self.immediate = immediate;
                self.rs = rs;
            }
            Kind::Beq | Kind::Bne => {
                self.expect_args(args, 3)?;
                self.rs = self.register(args[0])?;
                self.rt = self.register(args[1])?;
                match self.target_operand(args[2], 16)? {
                    Either::Left(immediate) => self.immediate = immediate,
                    Either::Right(label) => self.jumpto = Some(label),
                }
            }
            Kind::Lui => {
                self.expect_args(args, 2)?;
                self.rt = self.register(args[0])?;
                self.immediate = self.immediate_operand(args[1], 16)?;
            }
            Kind::J | Kind::Jal => {
                self.expect_args(args, 1)?;
                match self.target_operand(args[0], 26)? {
                    Either::Left(address) => self.address = address,
                    Either::Right(label) => self.jumpto = Some(label),
                }
            }
        }
        Ok(())
    }

    /// Encode to the 32-bit machine word, resolving a symbolic target
    /// against the label table.
    pub fn encode(&self, labels: &HashMap<String, usize>) -> Result<u32, AssemblyError> {
        let word = match self.kind.form() {
            Form::Register => {
                (self.kind.opcode() << 26)
                    | ((self.rs as u32 & 0x1F) << 21)
                    | ((self.rt as u32 & 0x1F) << 16)
                    | ((self.rd as u32 & 0x1F) << 11)
                    | ((self.sa as u32 & 0x1F) << 6)
                    | self.kind.function().unwrap_or(0)
            }
            Form::Immediate => {
                let immediate = match &self.jumpto {
                    // Branch displacement in instruction units: the run loop
                    // adds it on top of the usual +1, landing on the label.
                    Some(label) => {
                        self.resolve(label, labels)? as i32 - 1 - self.step_no as i32
                    }
                    None => self.immediate,
                };
                (self.kind.opcode() << 26)
                    | ((self.rs as u32 & 0x1F) << 21)
                    | ((self.rt as u32 & 0x1F) << 16)
                    | (immediate as u32 & 0xFFFF)
            }
            Form::Jump => {
                // Jumps carry the absolute step index, not a byte address.
                let address = match &self.jumpto {
                    Some(label) => self.resolve(label, labels)? as i32,
                    None => self.address,
                };
                (self.kind.opcode() << 26) | (address as u32 & 0x03FF_FFFF)
            }
        };
        Ok(word)
    }

    /// Encode to the eight-hex-digit image word.
    pub fn to_hex(&self, labels: &HashMap<String, usize>) -> Result<String, AssemblyError> {
        Ok(word_to_hex(self.encode(labels)?))
    }

    /// Render back to assembly text. Registers render numerically; a decoded
    /// instruction has no label, so branch and jump targets are numeric.
    pub fn to_code(&self) -> String {
        let operands = match self.kind {
            Kind::Add | Kind::Sub | Kind::And | Kind::Or | Kind::Xor => {
                format!("${}, ${}, ${}", self.rd, self.rs, self.rt)
            }
            Kind::Sll | Kind::Srl | Kind::Sra => {
                format!("${}, ${}, {}", self.rd, self.rt, self.sa)
            }
            Kind::Jr => format!("${}", self.rs),
            Kind::Addi => format!(
                "${}, ${}, {}",
                self.rt,
                self.rs,
                sign_extend(self.immediate, 16)
            ),
            Kind::Andi | Kind::Ori | Kind::Xori => format!(
                "${}, ${}, {}",
                self.rt,
                self.rs,
                zero_extend(self.immediate, 16)
            ),
            Kind::Lw | Kind::Sw => format!(
                "${}, {}(${})",
                self.rt,
                sign_extend(self.immediate, 16),
                self.rs
            ),
            Kind::Beq | Kind::Bne => {
                let target = match &self.jumpto {
                    Some(label) => label.clone(),
                    None => sign_extend(self.immediate, 16).to_string(),
                };
                format!("${}, ${}, {}", self.rs, self.rt, target)
            }
            Kind::Lui => format!("${}, {}", self.rt, self.immediate),
            Kind::J | Kind::Jal => match &self.jumpto {
                Some(label) => label.clone(),
                None => self.address.to_string(),
            },
        };
        format!("\t{}\t{}", self.kind.mnemonic(), operands)
    }

    /// Execute against the architectural state and return the next PC.
    /// All arithmetic wraps on 32-bit two's complement.
    pub fn run(&self, pc: i32, regfile: &mut RegisterFile, memory: &mut Memory) -> i32 {
        let mut next_pc = pc;
        let mut advance = true;

        match self.kind {
            Kind::Add => regfile.set(
                self.rd,
                regfile.get(self.rs).wrapping_add(regfile.get(self.rt)),
            ),
            Kind::Sub => regfile.set(
                self.rd,
                regfile.get(self.rs).wrapping_sub(regfile.get(self.rt)),
            ),
            Kind::And => regfile.set(self.rd, regfile.get(self.rs) & regfile.get(self.rt)),
            Kind::Or => regfile.set(self.rd, regfile.get(self.rs) | regfile.get(self.rt)),
            Kind::Xor => regfile.set(self.rd, regfile.get(self.rs) ^ regfile.get(self.rt)),
            Kind::Sll => regfile.set(self.rd, regfile.get(self.rt).wrapping_shl(self.sa as u32)),
            // SRL and SRA are deliberately swapped relative to canonical
            // MIPS: srl is the sign-preserving shift, sra the zero-filling
            // one.
            Kind::Srl => regfile.set(self.rd, regfile.get(self.rt).wrapping_shr(self.sa as u32)),
            Kind::Sra => regfile.set(
                self.rd,
                (regfile.get(self.rt) as u32).wrapping_shr(self.sa as u32) as i32,
            ),
            Kind::Jr => {
                // The raw register value is the next step index.
                next_pc = regfile.get(self.rs);
                advance = false;
            }
            Kind::Addi => regfile.set(
                self.rt,
                regfile.get(self.rs).wrapping_add(self.immediate),
            ),
            Kind::Andi => regfile.set(self.rt, regfile.get(self.rs) & self.immediate),
            Kind::Ori => regfile.set(self.rt, regfile.get(self.rs) | self.immediate),
            Kind::Xori => regfile.set(self.rt, regfile.get(self.rs) ^ self.immediate),
            Kind::Lw => regfile.set(
                self.rt,
                memory.read(regfile.get(self.rs).wrapping_add(self.immediate)),
            ),
            Kind::Sw => {
                memory.write(
                    regfile.get(self.rs).wrapping_add(self.immediate),
                    regfile.get(self.rt),
                );
            }
            Kind::Beq => {
                if regfile.get(self.rs) == regfile.get(self.rt) {
                    next_pc = next_pc.wrapping_add(self.immediate);
                }
            }
            Kind::Bne => {
                if regfile.get(self.rs) != regfile.get(self.rt) {
                    next_pc = next_pc.wrapping_add(self.immediate);
                }
            }
            Kind::Lui => regfile.set(self.rt, self.immediate.wrapping_shl(16)),
            Kind::J | Kind::Jal => {
                if self.kind == Kind::Jal {
                    regfile.set(REG_RA, next_pc.wrapping_add(1));
                }
                // Keep the top nibble of the would-be next PC; the shift and
                // divide reduce the address back to a step index.
                next_pc = (next_pc.wrapping_add(1) & 0xF000_0000u32 as i32)
                    .wrapping_add(self.address.wrapping_shl(2) / 4);
                advance = false;
            }
        }

        if advance {
            next_pc.wrapping_add(1)
        } else {
            next_pc
        }
    }

    fn expect_args(&self, args: &[&str], expected: usize) -> Result<(), AssemblyError> {
        if args.len() == expected {
            Ok(())
        } else {
            Err(AssemblyError::InvalidArgument {
                msg: format!(
                    "{} argument(s) expected, but found {}",
                    expected,
                    args.len()
                ),
                line: self.line_no,
            })
        }
    }

    fn register(&self, operand: &str) -> Result<i32, AssemblyError> {
        register_number(operand).ok_or_else(|| self.invalid_argument(operand))
    }

    fn immediate_operand(&self, operand: &str, bits: u32) -> Result<i32, AssemblyError> {
        parse_int(operand)
            .and_then(|value| fit_signed(value, bits))
            .ok_or_else(|| self.invalid_argument(operand))
    }

    /// A branch/jump target: integer form is a numeric operand, anything
    /// else is kept symbolic for the encoder to resolve.
    fn target_operand(
        &self,
        operand: &str,
        bits: u32,
    ) -> Result<Either<i32, String>, AssemblyError> {
        if is_integer_form(operand) {
            Ok(Either::Left(self.immediate_operand(operand, bits)?))
        } else {
            Ok(Either::Right(operand.to_string()))
        }
    }

    /// A load/store operand in the shape `<imm>($<digits>)`.
    fn memory_operand(&self, operand: &str) -> Result<(i32, i32), AssemblyError> {
        let parts = operand
            .strip_suffix(')')
            .and_then(|inner| inner.split_once("($"));
        let (offset, base) = match parts {
            Some((offset, base))
                if !base.is_empty()
                    && base.len() <= 2
                    && base.bytes().all(|b| b.is_ascii_digit()) =>
            {
                (offset, base)
            }
            _ => return Err(self.invalid_argument(operand)),
        };

        let rs = self.register(&format!("${}", base))?;
        let immediate = self.immediate_operand(offset, 16)?;
        Ok((immediate, rs))
    }

    fn invalid_argument(&self, operand: &str) -> AssemblyError {
        AssemblyError::InvalidArgument {
            msg: operand.to_string(),
            line: self.line_no,
        }
    }

    fn resolve(
        &self,
        label: &str,
        labels: &HashMap<String, usize>,
    ) -> Result<usize, AssemblyError> {
        labels.get(label).copied().ok_or_else(|| {
            AssemblyError::LabelNotFound {
                label: label.to_string(),
                line: self.line_no,
            }
        })
    }
}
