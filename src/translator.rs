use crate::backend::asm::render;
use crate::backend::codegen::{CodeGen, ENTRY_FUNCTION};
use crate::error::ErrorList;
use crate::frontend::instruction::Instruction;
use crate::frontend::parser::{ParsedLine, parse};

/// A successful translation: the complete assembly text plus any
/// non-fatal findings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub asm: String,
    pub warnings: Vec<Warning>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub message: String,
}

/// Drives the translation of one submission: one or more named VM source
/// units into a single assembly output.
///
/// `translate` builds all of its working state (label counters, current
/// function, output buffer) from scratch on every call, so calling it
/// twice yields byte-identical output and independent translators can
/// run concurrently.
#[derive(Debug, Default)]
pub struct Translator {
    sources: Vec<(String, String)>,
}

impl Translator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a translation unit. The unit name scopes static variables
    /// and top-level labels; for file input it is the file stem.
    pub fn add_source(&mut self, unit: impl Into<String>, text: impl Into<String>) {
        self.sources.push((unit.into(), text.into()));
    }

    /// Translates every queued unit. All-or-nothing: any failure in any
    /// unit returns the full error list and no assembly.
    pub fn translate(&self) -> Result<Translation, ErrorList> {
        let mut errors = ErrorList::new();
        let mut units: Vec<(&str, Vec<ParsedLine>)> = Vec::new();

        for (unit, text) in &self.sources {
            match parse(unit, text) {
                Ok(lines) => units.push((unit, lines)),
                Err(unit_errors) => errors.extend(unit_errors),
            }
        }
        if !errors.is_empty() {
            return Err(errors);
        }

        let mut warnings = Vec::new();
        let mut codegen = CodeGen::new();
        if defines_entry_function(&units) {
            if let Err(error) = codegen.emit_bootstrap() {
                errors.push(error);
            }
        } else {
            warnings.push(Warning {
                message: format!(
                    "no `{}` function defined; bootstrap code not emitted",
                    ENTRY_FUNCTION
                ),
            });
        }

        for (unit, lines) in &units {
            codegen.begin_unit(unit);
            for line in lines {
                if let Err(error) = codegen.emit(line) {
                    errors.push(error);
                }
            }
        }
        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(Translation {
            asm: render(&codegen.into_asm()),
            warnings,
        })
    }
}

fn defines_entry_function(units: &[(&str, Vec<ParsedLine>)]) -> bool {
    units.iter().any(|(_, lines)| {
        lines.iter().any(|line| {
            matches!(&line.instruction,
                Instruction::Function { name, .. } if name == ENTRY_FUNCTION)
        })
    })
}
