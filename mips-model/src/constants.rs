// Operation codes
pub const OP_R_TYPE: u32 = 0;
pub const OP_J: u32 = 0x02;
pub const OP_JAL: u32 = 0x03;
pub const OP_BEQ: u32 = 0x04;
pub const OP_BNE: u32 = 0x05;
pub const OP_ADDI: u32 = 0x08;
pub const OP_ANDI: u32 = 0x0C;
pub const OP_ORI: u32 = 0x0D;
pub const OP_XORI: u32 = 0x0E;
pub const OP_LUI: u32 = 0x0F;
pub const OP_LW: u32 = 0x23;
pub const OP_SW: u32 = 0x2B;

// R-type function codes
pub const FUNCTION_SLL: u32 = 0x00;
pub const FUNCTION_SRL: u32 = 0x02;
pub const FUNCTION_SRA: u32 = 0x03;
pub const FUNCTION_JR: u32 = 0x08;
pub const FUNCTION_ADD: u32 = 0x20;
pub const FUNCTION_SUB: u32 = 0x22;
pub const FUNCTION_AND: u32 = 0x24;
pub const FUNCTION_OR: u32 = 0x25;
pub const FUNCTION_XOR: u32 = 0x26;

/// The link register written by JAL
pub const REG_RA: i32 = 31;

/// Alias names for registers, indexed by register number
pub static REGISTER_NAMES: [&str; 32] = [
    "zero", "at", "v0", "v1", "a0", "a1", "a2", "a3", "t0", "t1", "t2", "t3",
    "t4", "t5", "t6", "t7", "s0", "s1", "s2", "s3", "s4", "s5", "s6", "s7",
    "t8", "t9", "k0", "k1", "gp", "sp", "fp", "ra",
];

/// Resolve a register operand (`$2` or `$ra`) to its number.
/// Returns `None` when the operand names no architectural register.
pub fn register_number(operand: &str) -> Option<i32> {
    let name = operand.strip_prefix('$')?;

    if let Ok(number) = name.parse::<i32>() {
        return if (0..32).contains(&number) {
            Some(number)
        } else {
            None
        };
    }

    REGISTER_NAMES
        .iter()
        .position(|&alias| alias == name)
        .map(|index| index as i32)
}
