//! Translator from the stack-oriented Hack VM instruction language to
//! Hack assembly.
//!
//! The pipeline is a direct, single-pass mapping: source text is parsed
//! into typed [`frontend::instruction::Instruction`]s, then each one is
//! expanded into the equivalent assembly sequence. Translation is
//! all-or-nothing: on any failure the full error list comes back and no
//! assembly is produced.
//!
//! ```
//! let asm = vmt::translate("push constant 7\npush constant 8\nadd", "SimpleAdd").unwrap();
//! assert!(asm.contains("@7"));
//! ```

pub mod backend;
pub mod error;
pub mod frontend;
pub mod translator;

pub use error::{ErrorList, TranslateError};
pub use translator::{Translation, Translator, Warning};

/// Translates a single VM source unit into assembly text. `unit` names
/// the translation unit (static-variable scoping); for file input it is
/// the file stem.
pub fn translate(source: &str, unit: &str) -> Result<String, ErrorList> {
    let mut translator = Translator::new();
    translator.add_source(unit, source);
    translator.translate().map(|translation| translation.asm)
}
