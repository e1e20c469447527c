//! The hex image line codec (an Altera-MIF-like format).
//!
//! Output lines look like ` 3 :     08000000; % (0C) %`. Input is looser:
//! a hex byte address, a colon, eight hex characters, and a terminating
//! semicolon; anything after the semicolon is ignored.

use crate::error::AssemblyError;
use crate::instruction::Instruction;

/// Format one image line for the instruction at `step`.
pub fn format_line(step: usize, word_hex: &str) -> String {
    format!("{:>2X} :     {}; % ({:02X}) %\n", step, word_hex, step * 4)
}

/// Decode a hex image into instructions. Blank lines are skipped; anything
/// else that does not match the line shape is a syntax error.
pub fn decode_image(image: &str) -> Result<Vec<Instruction>, AssemblyError> {
    let mut instructions = Vec::new();

    for (index, line) in image.lines().enumerate() {
        let line_no = index + 1;
        if line.trim().is_empty() {
            continue;
        }

        let invalid = || AssemblyError::Syntax {
            msg: format!("Invalid format ({})", line),
            line: line_no,
        };
        let (address, word) = split_line(line).ok_or_else(invalid)?;
        let byte_address = u32::from_str_radix(address, 16).map_err(|_| invalid())?;
        instructions.push(Instruction::decode(
            word,
            line_no,
            (byte_address / 4) as usize,
        )?);
    }

    Ok(instructions)
}

/// Split an image line into its address and word captures.
fn split_line(line: &str) -> Option<(&str, &str)> {
    let (left, right) = line.split_once(':')?;

    let address = left.trim();
    if address.is_empty() || !address.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return None;
    }

    let rest = right.trim_start();
    let word = rest.get(..8)?;
    if !word.bytes().all(|b| b.is_ascii_alphanumeric()) || !rest[8..].starts_with(';') {
        return None;
    }

    Some((address, word))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::Kind;
    use pretty_assertions::assert_eq;

    #[test]
    fn format_pads_step_and_byte_address() {
        assert_eq!(format_line(0, "08000000"), " 0 :     08000000; % (00) %\n");
        assert_eq!(format_line(10, "00221820"), " A :     00221820; % (28) %\n");
        assert_eq!(format_line(16, "2002ffff"), "10 :     2002ffff; % (40) %\n");
    }

    #[test]
    fn decodes_its_own_output() {
        let image = format_line(0, "20020005") + &format_line(1, "08000000");
        let instructions = decode_image(&image).unwrap();
        assert_eq!(instructions.len(), 2);
        assert_eq!(instructions[0].kind(), Kind::Addi);
        assert_eq!(instructions[1].kind(), Kind::J);
    }

    #[test]
    fn accepts_the_loose_input_shape() {
        let instructions = decode_image("4:2002ffff;junk\n").unwrap();
        assert_eq!(instructions.len(), 1);
        assert_eq!(instructions[0].kind(), Kind::Addi);
    }

    #[test]
    fn skips_blank_lines() {
        let image = format_line(0, "20020005") + "\n   \n" + &format_line(2, "08000000");
        assert_eq!(decode_image(&image).unwrap().len(), 2);
    }

    #[test]
    fn rejects_malformed_lines() {
        assert_eq!(
            decode_image("not an image line\n"),
            Err(AssemblyError::Syntax {
                msg: "Invalid format (not an image line)".to_string(),
                line: 1,
            })
        );
        assert!(decode_image("0 : 2002ffff\n").is_err()); // missing semicolon
        assert!(decode_image("0 : 2002fff;\n").is_err()); // short word
    }
}
