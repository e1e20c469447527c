//! The assembler performs two passes: `parse` tokenizes the source into an
//! instruction list while collecting the label table, and `assemble`
//! encodes every instruction into the hex image, resolving symbolic
//! branch/jump targets against the table.

use mips_model::bits::is_integer_form;
use mips_model::image::format_line;
use mips_model::{AssemblyError, Instruction, Kind};
use std::collections::HashMap;

/// A MIPS assembler.
#[derive(Debug, Default)]
pub struct Assembler {
    instructions: Vec<Instruction>,
    labels: HashMap<String, usize>,
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// The instructions collected by `parse`, in program order.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Parse assembly source. Each line is `[label:] [mnemonic operands]
    /// [; comment]`; instruction statements must be indented so the label
    /// field stays distinguishable.
    pub fn parse(&mut self, source: &str) -> Result<(), AssemblyError> {
        // line_no counts every source line; step_no only advances when a
        // line contributes an instruction.
        let mut step_no = self.instructions.len();

        for (index, line) in source.lines().enumerate() {
            let line_no = index + 1;

            // Strip the comment, if any
            let code = match line.find(';') {
                Some(position) => &line[..position],
                None => line,
            };
            if code.trim().is_empty() {
                continue;
            }

            let fields = split_fields(code);
            let fields: Vec<&str> = fields.iter().map(|field| field.trim()).collect();
            if fields.len() != 1 && fields.len() != 3 {
                return Err(AssemblyError::Syntax {
                    msg: "No arguments given (maybe you're missing head tab/space?)".to_string(),
                    line: line_no,
                });
            }

            // The first field is either a label or empty
            let label_field = fields[0];
            if let Some(label) = label_field.strip_suffix(':') {
                // An integer label would be ambiguous with a numeric target
                if is_integer_form(label) {
                    return Err(AssemblyError::Syntax {
                        msg: format!("Label cannot be an integer ({})", label),
                        line: line_no,
                    });
                }
                log::trace!("label {} -> step {}", label, step_no);
                self.labels.insert(label.to_string(), step_no);
            } else if !label_field.is_empty() {
                return Err(AssemblyError::Syntax {
                    msg: format!("Label must be followed by ':' ({})", label_field),
                    line: line_no,
                });
            }

            if fields.len() == 3 {
                let mnemonic = fields[1];
                let kind = Kind::from_mnemonic(mnemonic).ok_or_else(|| {
                    AssemblyError::Syntax {
                        msg: format!("Invalid mnemonic ({})", mnemonic),
                        line: line_no,
                    }
                })?;

                let mut instruction = Instruction::new(kind, line_no, step_no);
                instruction.parse_args(&split_operands(fields[2]))?;
                self.instructions.push(instruction);
                step_no += 1;
            }
        }

        log::debug!(
            "parsed {} instruction(s) and {} label(s)",
            self.instructions.len(),
            self.labels.len()
        );
        Ok(())
    }

    /// Encode the parsed instructions into the hex image.
    pub fn assemble(&self) -> Result<String, AssemblyError> {
        let mut image = String::new();
        for (step, instruction) in self.instructions.iter().enumerate() {
            image.push_str(&format_line(step, &instruction.to_hex(&self.labels)?));
        }
        Ok(image)
    }
}

/// Split a statement on runs of spaces/tabs into at most three fields. A
/// leading separator yields an empty first field (the empty label slot) and
/// a trailing separator an empty last one, so field counts stay meaningful
/// for diagnostics.
fn split_fields(code: &str) -> Vec<&str> {
    let mut fields = Vec::with_capacity(3);
    let mut rest = code;

    while fields.len() < 2 {
        match rest.find([' ', '\t']) {
            Some(position) => {
                fields.push(&rest[..position]);
                rest = rest[position..].trim_start_matches([' ', '\t']);
            }
            None => {
                fields.push(rest);
                return fields;
            }
        }
    }

    fields.push(rest);
    fields
}

/// Split an operand list on commas, eating whitespace after each comma but
/// not before it. Trailing empty operands are dropped.
fn split_operands(operands: &str) -> Vec<&str> {
    let mut split: Vec<&str> = operands
        .split(',')
        .enumerate()
        .map(|(index, operand)| {
            if index == 0 {
                operand
            } else {
                operand.trim_start_matches([' ', '\t'])
            }
        })
        .collect();

    while split.last() == Some(&"") {
        split.pop();
    }
    split
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn assemble(source: &str) -> Result<String, AssemblyError> {
        let mut assembler = Assembler::new();
        assembler.parse(source)?;
        assembler.assemble()
    }

    #[test]
    fn assembles_a_self_loop() {
        assert_eq!(
            assemble("start: j start\n").unwrap(),
            " 0 :     08000000; % (00) %\n"
        );
    }

    #[test]
    fn branch_back_encodes_a_negative_displacement() {
        let image = assemble("l: addi $1, $1, 1\n\tbne $1, $0, l\n").unwrap();
        let lines: Vec<&str> = image.lines().collect();
        assert_eq!(lines[0], " 0 :     20210001; % (00) %");
        assert_eq!(lines[1], " 1 :     1420fffe; % (04) %");
    }

    #[test]
    fn forward_label_resolves() {
        let image = assemble("\tjal target\n\tadd $1, $1, $1\ntarget:\tjr $31\n").unwrap();
        let lines: Vec<&str> = image.lines().collect();
        assert_eq!(lines[0], " 0 :     0c000002; % (00) %");
    }

    #[test]
    fn label_only_lines_take_the_next_step() {
        let mut assembler = Assembler::new();
        assembler
            .parse("\taddi $1, $0, 1\ndone:\n\taddi $2, $0, 2\n")
            .unwrap();
        assert_eq!(assembler.labels.get("done"), Some(&1));
        assert_eq!(assembler.instructions().len(), 2);
    }

    #[test]
    fn duplicate_labels_keep_the_last_definition() {
        let mut assembler = Assembler::new();
        assembler
            .parse("l:\taddi $1, $0, 1\nl:\taddi $2, $0, 2\n")
            .unwrap();
        assert_eq!(assembler.labels.get("l"), Some(&1));
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let image = assemble("; header comment\n\n\taddi $1, $0, 1 ; trailing\n").unwrap();
        assert_eq!(image.lines().count(), 1);
    }

    #[test]
    fn unindented_statements_are_rejected() {
        // Without the leading tab the first operand lands in the mnemonic
        // field.
        assert_eq!(
            assemble("add $1, $2, $3\n"),
            Err(AssemblyError::Syntax {
                msg: "Invalid mnemonic ($1,)".to_string(),
                line: 1,
            })
        );
    }

    #[test]
    fn missing_operand_field_is_a_syntax_error() {
        assert_eq!(
            assemble("\tadd\n"),
            Err(AssemblyError::Syntax {
                msg: "No arguments given (maybe you're missing head tab/space?)".to_string(),
                line: 1,
            })
        );
    }

    #[test]
    fn integer_labels_are_rejected() {
        assert_eq!(
            assemble("12:\tadd $1, $2, $3\n"),
            Err(AssemblyError::Syntax {
                msg: "Label cannot be an integer (12)".to_string(),
                line: 1,
            })
        );
    }

    #[test]
    fn bare_first_field_must_be_a_label() {
        assert_eq!(
            assemble("main\tadd\t$1, $2, $3\n"),
            Err(AssemblyError::Syntax {
                msg: "Label must be followed by ':' (main)".to_string(),
                line: 1,
            })
        );
    }

    #[test]
    fn unknown_mnemonics_are_rejected() {
        assert_eq!(
            assemble("\tmul $1, $2, $3\n"),
            Err(AssemblyError::Syntax {
                msg: "Invalid mnemonic (mul)".to_string(),
                line: 1,
            })
        );
    }

    #[test]
    fn undefined_labels_fail_at_encode_time() {
        assert_eq!(
            assemble("\tj nowhere\n"),
            Err(AssemblyError::LabelNotFound {
                label: "nowhere".to_string(),
                line: 1,
            })
        );
    }

    #[test]
    fn operand_splitting_eats_whitespace_after_commas_only() {
        assert_eq!(split_operands("$1, $2,\t$3"), vec!["$1", "$2", "$3"]);
        assert_eq!(split_operands("$1 , $2"), vec!["$1 ", "$2"]);
        assert_eq!(split_operands("$1,$2,"), vec!["$1", "$2"]);
        assert_eq!(split_operands("8($0)"), vec!["8($0)"]);
    }

    #[test]
    fn field_splitting_keeps_boundary_empties() {
        assert_eq!(split_fields("\tadd\t$1, $2, $3"), vec!["", "add", "$1, $2, $3"]);
        assert_eq!(split_fields("loop:"), vec!["loop:"]);
        assert_eq!(split_fields("loop: "), vec!["loop:", ""]);
        assert_eq!(
            split_fields("loop:\tbeq\t$2, $0, done"),
            vec!["loop:", "beq", "$2, $0, done"]
        );
    }
}
