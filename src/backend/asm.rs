use std::fmt::{Display, Formatter};

/// One line of generated Hack assembly.
///
/// The full set of C-instruction texts used by the generator is finite,
/// so they are carried as static strings instead of a dest/comp/jump
/// triple; A-instructions and labels are the only dynamic parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Asm {
    /// `@n` with a literal address or constant.
    A(u16),
    /// `@symbol` referencing a predefined symbol, static slot or label.
    ASym(String),
    /// A complete C-instruction, e.g. `D=M` or `0;JMP`.
    C(&'static str),
    /// `(label)` jump target.
    Label(String),
}

impl Display for Asm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Asm::A(value) => write!(f, "@{}", value),
            Asm::ASym(symbol) => write!(f, "@{}", symbol),
            Asm::C(text) => write!(f, "{}", text),
            Asm::Label(name) => write!(f, "({})", name),
        }
    }
}

/// Joins generated instructions into the final output text, one per line,
/// with a trailing newline.
pub fn render(asm: &[Asm]) -> String {
    let mut out = String::with_capacity(asm.len() * 8);
    for line in asm {
        out.push_str(&line.to_string());
        out.push('\n');
    }
    out
}
