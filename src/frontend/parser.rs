use crate::error::TranslateError;
use crate::frontend::instruction::{ArithmeticOp, Instruction, Segment};

/// Largest value loadable by an A-instruction; indices and counts beyond
/// it cannot be addressed on the target machine.
const MAX_ADDRESS: i64 = 0x7FFF;

/// A well-formed instruction together with where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    pub line: usize,
    pub text: String,
    pub instruction: Instruction,
}

/// Parses one translation unit of VM source. Comments and blank lines are
/// skipped; line numbers count raw input lines, 1-based. Either every line
/// is well-formed or the full list of failures comes back, one entry per
/// bad line.
pub fn parse(unit: &str, source: &str) -> Result<Vec<ParsedLine>, Vec<TranslateError>> {
    let mut parsed = Vec::new();
    let mut errors = Vec::new();

    for (idx, raw) in source.lines().enumerate() {
        let line = idx + 1;
        let text = strip_comment(raw).trim();
        if text.is_empty() {
            continue;
        }

        match parse_line(unit, line, text) {
            Ok(instruction) => parsed.push(ParsedLine {
                line,
                text: text.to_string(),
                instruction,
            }),
            Err(error) => errors.push(error),
        }
    }

    if errors.is_empty() { Ok(parsed) } else { Err(errors) }
}

fn strip_comment(line: &str) -> &str {
    match line.find("//") {
        Some(pos) => &line[..pos],
        None => line,
    }
}

fn parse_line(unit: &str, line: usize, text: &str) -> Result<Instruction, TranslateError> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let op = tokens[0];

    if let Ok(arithmetic) = ArithmeticOp::try_from(op) {
        expect_arity(unit, line, text, &tokens, 1)?;
        return Ok(Instruction::Arithmetic(arithmetic));
    }

    match op {
        "push" | "pop" => {
            expect_arity(unit, line, text, &tokens, 3)?;
            let segment = parse_segment(unit, line, text, tokens[1])?;
            let index = parse_index(unit, line, text, tokens[2], "index")?;
            check_segment_index(unit, line, text, segment, index)?;
            if op == "push" {
                Ok(Instruction::Push { segment, index })
            } else if segment == Segment::Constant {
                Err(semantic(unit, line, text, "cannot pop to the constant segment"))
            } else {
                Ok(Instruction::Pop { segment, index })
            }
        }
        "label" | "goto" | "if-goto" => {
            expect_arity(unit, line, text, &tokens, 2)?;
            let name = parse_identifier(unit, line, text, tokens[1], "label")?;
            Ok(match op {
                "label" => Instruction::Label(name),
                "goto" => Instruction::Goto(name),
                _ => Instruction::IfGoto(name),
            })
        }
        "function" | "call" => {
            expect_arity(unit, line, text, &tokens, 3)?;
            let name = parse_identifier(unit, line, text, tokens[1], "function name")?;
            if op == "function" {
                let locals = parse_index(unit, line, text, tokens[2], "local count")?;
                Ok(Instruction::Function { name, locals })
            } else {
                let args = parse_index(unit, line, text, tokens[2], "argument count")?;
                Ok(Instruction::Call { name, args })
            }
        }
        "return" => {
            expect_arity(unit, line, text, &tokens, 1)?;
            Ok(Instruction::Return)
        }
        _ => Err(TranslateError::Parse {
            unit: unit.to_string(),
            line,
            text: text.to_string(),
            message: format!("unknown instruction `{}`", op),
        }),
    }
}

fn expect_arity(
    unit: &str,
    line: usize,
    text: &str,
    tokens: &[&str],
    expected: usize,
) -> Result<(), TranslateError> {
    if tokens.len() == expected {
        return Ok(());
    }
    Err(TranslateError::Parse {
        unit: unit.to_string(),
        line,
        text: text.to_string(),
        message: format!(
            "`{}` takes {} operand(s), got {}",
            tokens[0],
            expected - 1,
            tokens.len() - 1
        ),
    })
}

fn parse_segment(
    unit: &str,
    line: usize,
    text: &str,
    token: &str,
) -> Result<Segment, TranslateError> {
    Segment::try_from(token).map_err(|_| TranslateError::Resolution {
        unit: unit.to_string(),
        line,
        text: text.to_string(),
        message: format!("unknown segment `{}`", token),
    })
}

fn parse_index(
    unit: &str,
    line: usize,
    text: &str,
    token: &str,
    what: &str,
) -> Result<u16, TranslateError> {
    let value: i64 = token.parse().map_err(|_| TranslateError::Parse {
        unit: unit.to_string(),
        line,
        text: text.to_string(),
        message: format!("{} `{}` is not an integer", what, token),
    })?;
    if value < 0 {
        return Err(semantic(
            unit,
            line,
            text,
            &format!("{} cannot be negative", what),
        ));
    }
    if value > MAX_ADDRESS {
        return Err(semantic(
            unit,
            line,
            text,
            &format!("{} {} does not fit in an address", what, value),
        ));
    }
    Ok(value as u16)
}

fn check_segment_index(
    unit: &str,
    line: usize,
    text: &str,
    segment: Segment,
    index: u16,
) -> Result<(), TranslateError> {
    match segment {
        Segment::Pointer if index > 1 => {
            Err(semantic(unit, line, text, "pointer index must be 0 or 1"))
        }
        Segment::Temp if index > 7 => Err(semantic(unit, line, text, "temp index must be below 8")),
        _ => Ok(()),
    }
}

fn parse_identifier(
    unit: &str,
    line: usize,
    text: &str,
    token: &str,
    what: &str,
) -> Result<String, TranslateError> {
    if is_identifier(token) {
        return Ok(token.to_string());
    }
    Err(TranslateError::Resolution {
        unit: unit.to_string(),
        line,
        text: text.to_string(),
        message: format!("malformed {} `{}`", what, token),
    })
}

// Hack symbol grammar: letters, digits, `_`, `.`, `:`, `$`, not starting
// with a digit.
fn is_identifier(token: &str) -> bool {
    let mut chars = token.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || matches!(c, '_' | '.' | ':' | '$') => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':' | '$'))
}

fn semantic(unit: &str, line: usize, text: &str, message: &str) -> TranslateError {
    TranslateError::Semantic {
        unit: unit.to_string(),
        line,
        text: text.to_string(),
        message: message.to_string(),
    }
}
