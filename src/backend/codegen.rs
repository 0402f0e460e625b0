use crate::backend::asm::Asm;
use crate::backend::labels::{
    Labels, SCRATCH_ADDR, SCRATCH_RET, TEMP_BASE, pointer_symbol, segment_base,
};
use crate::error::TranslateError;
use crate::frontend::instruction::{ArithmeticOp, Instruction, Segment};
use crate::frontend::parser::ParsedLine;

/// Address the stack pointer is initialized to by the bootstrap code.
const STACK_BASE: u16 = 256;

/// The function the bootstrap code transfers control to.
pub const ENTRY_FUNCTION: &str = "Sys.init";

/// Order in which a call site saves the caller's base pointers. The
/// return sequence restores them in reverse; both sequences are defined
/// only here.
const SAVED_POINTERS: [&str; 4] = ["LCL", "ARG", "THIS", "THAT"];

/// Maps parsed VM instructions onto Hack assembly, one instruction at a
/// time, appending to an output buffer. Owns the label manager; all of
/// its state is per-translation.
#[derive(Debug, Default)]
pub struct CodeGen {
    asm: Vec<Asm>,
    labels: Labels,
}

impl CodeGen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_unit(&mut self, name: &str) {
        self.labels.enter_unit(name);
    }

    /// Emits the once-per-translation bootstrap: stack pointer setup and
    /// a standard call into the entry function.
    pub fn emit_bootstrap(&mut self) -> Result<(), TranslateError> {
        self.labels.enter_unit("Bootstrap");
        self.asm.push(Asm::A(STACK_BASE));
        self.asm.push(Asm::C("D=A"));
        self.asm.push(Asm::ASym("SP".into()));
        self.asm.push(Asm::C("M=D"));
        self.emit_call_sequence(ENTRY_FUNCTION, 0)
    }

    pub fn emit(&mut self, parsed: &ParsedLine) -> Result<(), TranslateError> {
        match &parsed.instruction {
            Instruction::Arithmetic(op) => self.emit_arithmetic(*op),
            Instruction::Push { segment, index } => self.emit_push(*segment, *index),
            Instruction::Pop { segment, index } => self.emit_pop(parsed, *segment, *index),
            Instruction::Label(name) => self.emit_label(parsed, name),
            Instruction::Goto(name) => {
                let target = self.labels.flow_label(name);
                self.asm.push(Asm::ASym(target));
                self.asm.push(Asm::C("0;JMP"));
                Ok(())
            }
            Instruction::IfGoto(name) => {
                let target = self.labels.flow_label(name);
                self.pop_to_d();
                self.asm.push(Asm::ASym(target));
                self.asm.push(Asm::C("D;JNE"));
                Ok(())
            }
            Instruction::Function { name, locals } => self.emit_function(parsed, name, *locals),
            Instruction::Call { name, args } => self.emit_call_sequence(name, *args),
            Instruction::Return => {
                self.emit_return_sequence();
                Ok(())
            }
        }
    }

    pub fn into_asm(self) -> Vec<Asm> {
        self.asm
    }

    fn emit_arithmetic(&mut self, op: ArithmeticOp) -> Result<(), TranslateError> {
        if op.is_comparison() {
            return self.emit_comparison(op);
        }
        match op {
            // Binary: pop into D, point at the new top, combine in place.
            ArithmeticOp::Add => self.emit_binary("M=D+M"),
            ArithmeticOp::Sub => self.emit_binary("M=M-D"),
            ArithmeticOp::And => self.emit_binary("M=D&M"),
            ArithmeticOp::Or => self.emit_binary("M=D|M"),
            // Unary: rewrite the top in place, stack depth unchanged.
            ArithmeticOp::Neg => self.emit_unary("M=-M"),
            ArithmeticOp::Not => self.emit_unary("M=!M"),
            ArithmeticOp::Eq | ArithmeticOp::Gt | ArithmeticOp::Lt => unreachable!(),
        }
        Ok(())
    }

    fn emit_binary(&mut self, combine: &'static str) {
        self.asm.push(Asm::ASym("SP".into()));
        self.asm.push(Asm::C("AM=M-1"));
        self.asm.push(Asm::C("D=M"));
        self.asm.push(Asm::C("A=A-1"));
        self.asm.push(Asm::C(combine));
    }

    fn emit_unary(&mut self, rewrite: &'static str) {
        self.asm.push(Asm::ASym("SP".into()));
        self.asm.push(Asm::C("A=M-1"));
        self.asm.push(Asm::C(rewrite));
    }

    /// Comparisons branch on `x - y` through a freshly labelled pair of
    /// arms, leaving -1 (true) or 0 (false) on the stack top.
    fn emit_comparison(&mut self, op: ArithmeticOp) -> Result<(), TranslateError> {
        let jump = match op {
            ArithmeticOp::Eq => "D;JEQ",
            ArithmeticOp::Gt => "D;JGT",
            ArithmeticOp::Lt => "D;JLT",
            _ => unreachable!(),
        };
        let (when_true, end) = self.labels.comparison_pair(&op.to_string())?;

        self.asm.push(Asm::ASym("SP".into()));
        self.asm.push(Asm::C("AM=M-1"));
        self.asm.push(Asm::C("D=M"));
        self.asm.push(Asm::C("A=A-1"));
        self.asm.push(Asm::C("D=M-D"));
        self.asm.push(Asm::ASym(when_true.clone()));
        self.asm.push(Asm::C(jump));
        self.asm.push(Asm::ASym("SP".into()));
        self.asm.push(Asm::C("A=M-1"));
        self.asm.push(Asm::C("M=0"));
        self.asm.push(Asm::ASym(end.clone()));
        self.asm.push(Asm::C("0;JMP"));
        self.asm.push(Asm::Label(when_true));
        self.asm.push(Asm::ASym("SP".into()));
        self.asm.push(Asm::C("A=M-1"));
        self.asm.push(Asm::C("M=-1"));
        self.asm.push(Asm::Label(end));
        Ok(())
    }

    fn emit_push(&mut self, segment: Segment, index: u16) -> Result<(), TranslateError> {
        match segment {
            Segment::Constant => {
                self.asm.push(Asm::A(index));
                self.asm.push(Asm::C("D=A"));
            }
            Segment::Local | Segment::Argument | Segment::This | Segment::That => {
                let base = segment_base(segment).expect("segment has a base pointer");
                self.asm.push(Asm::ASym(base.into()));
                self.asm.push(Asm::C("D=M"));
                self.asm.push(Asm::A(index));
                self.asm.push(Asm::C("A=D+A"));
                self.asm.push(Asm::C("D=M"));
            }
            Segment::Temp => {
                self.asm.push(Asm::A(TEMP_BASE + index));
                self.asm.push(Asm::C("D=M"));
            }
            Segment::Pointer => {
                self.asm.push(Asm::ASym(pointer_symbol(index).into()));
                self.asm.push(Asm::C("D=M"));
            }
            Segment::Static => {
                self.asm.push(Asm::ASym(self.labels.static_symbol(index)));
                self.asm.push(Asm::C("D=M"));
            }
        }
        self.push_d();
        Ok(())
    }

    fn emit_pop(
        &mut self,
        parsed: &ParsedLine,
        segment: Segment,
        index: u16,
    ) -> Result<(), TranslateError> {
        match segment {
            Segment::Constant => {
                // The parser rejects this; guard the invariant anyway.
                return Err(self.semantic(parsed, "cannot pop to the constant segment"));
            }
            Segment::Local | Segment::Argument | Segment::This | Segment::That => {
                let base = segment_base(segment).expect("segment has a base pointer");
                self.asm.push(Asm::ASym(base.into()));
                self.asm.push(Asm::C("D=M"));
                self.asm.push(Asm::A(index));
                self.asm.push(Asm::C("D=D+A"));
                self.asm.push(Asm::ASym(SCRATCH_ADDR.into()));
                self.asm.push(Asm::C("M=D"));
                self.pop_to_d();
                self.asm.push(Asm::ASym(SCRATCH_ADDR.into()));
                self.asm.push(Asm::C("A=M"));
                self.asm.push(Asm::C("M=D"));
            }
            Segment::Temp => {
                self.pop_to_d();
                self.asm.push(Asm::A(TEMP_BASE + index));
                self.asm.push(Asm::C("M=D"));
            }
            Segment::Pointer => {
                self.pop_to_d();
                self.asm.push(Asm::ASym(pointer_symbol(index).into()));
                self.asm.push(Asm::C("M=D"));
            }
            Segment::Static => {
                self.pop_to_d();
                self.asm.push(Asm::ASym(self.labels.static_symbol(index)));
                self.asm.push(Asm::C("M=D"));
            }
        }
        Ok(())
    }

    fn emit_label(&mut self, parsed: &ParsedLine, name: &str) -> Result<(), TranslateError> {
        let scoped = self.labels.flow_label(name);
        if !self.labels.define(&scoped) {
            return Err(self.semantic(
                parsed,
                &format!(
                    "label `{}` defined twice in function `{}`",
                    name,
                    self.labels.current_function()
                ),
            ));
        }
        self.asm.push(Asm::Label(scoped));
        Ok(())
    }

    fn emit_function(
        &mut self,
        parsed: &ParsedLine,
        name: &str,
        locals: u16,
    ) -> Result<(), TranslateError> {
        if !self.labels.define(name) {
            return Err(self.semantic(parsed, &format!("function `{}` declared twice", name)));
        }
        self.labels.enter_function(name);
        self.asm.push(Asm::Label(name.into()));
        // Locals start out zeroed, never as leftover memory.
        for _ in 0..locals {
            self.asm.push(Asm::ASym("SP".into()));
            self.asm.push(Asm::C("A=M"));
            self.asm.push(Asm::C("M=0"));
            self.asm.push(Asm::ASym("SP".into()));
            self.asm.push(Asm::C("M=M+1"));
        }
        Ok(())
    }

    /// The full call protocol: push the return address and the caller's
    /// four base pointers, reposition ARG below the pushed arguments and
    /// LCL at the stack top, jump, then place the return label.
    fn emit_call_sequence(&mut self, name: &str, args: u16) -> Result<(), TranslateError> {
        let ret = self.labels.return_label()?;

        self.asm.push(Asm::ASym(ret.clone()));
        self.asm.push(Asm::C("D=A"));
        self.push_d();
        for pointer in SAVED_POINTERS {
            self.asm.push(Asm::ASym(pointer.into()));
            self.asm.push(Asm::C("D=M"));
            self.push_d();
        }
        // ARG = SP - args - 5 (5 = return address + four saved pointers).
        self.asm.push(Asm::ASym("SP".into()));
        self.asm.push(Asm::C("D=M"));
        self.asm.push(Asm::A(args + 1 + SAVED_POINTERS.len() as u16));
        self.asm.push(Asm::C("D=D-A"));
        self.asm.push(Asm::ASym("ARG".into()));
        self.asm.push(Asm::C("M=D"));
        // LCL = SP.
        self.asm.push(Asm::ASym("SP".into()));
        self.asm.push(Asm::C("D=M"));
        self.asm.push(Asm::ASym("LCL".into()));
        self.asm.push(Asm::C("M=D"));

        self.asm.push(Asm::ASym(name.into()));
        self.asm.push(Asm::C("0;JMP"));
        self.asm.push(Asm::Label(ret));
        Ok(())
    }

    /// The full return protocol, mirroring `emit_call_sequence`: stash
    /// the frame end and return address, move the result into the
    /// caller-visible slot, restore the saved pointers in reverse order,
    /// jump through the stashed return address.
    fn emit_return_sequence(&mut self) {
        // R13 = LCL (end of the saved frame).
        self.asm.push(Asm::ASym("LCL".into()));
        self.asm.push(Asm::C("D=M"));
        self.asm.push(Asm::ASym(SCRATCH_ADDR.into()));
        self.asm.push(Asm::C("M=D"));
        // R14 = *(frame - 5), the return address. Grabbed before the
        // result lands in *ARG, which may alias it when args == 0.
        self.asm.push(Asm::A(1 + SAVED_POINTERS.len() as u16));
        self.asm.push(Asm::C("A=D-A"));
        self.asm.push(Asm::C("D=M"));
        self.asm.push(Asm::ASym(SCRATCH_RET.into()));
        self.asm.push(Asm::C("M=D"));
        // *ARG = pop(), the return value in the caller's stack top slot.
        self.pop_to_d();
        self.asm.push(Asm::ASym("ARG".into()));
        self.asm.push(Asm::C("A=M"));
        self.asm.push(Asm::C("M=D"));
        // SP = ARG + 1.
        self.asm.push(Asm::ASym("ARG".into()));
        self.asm.push(Asm::C("D=M+1"));
        self.asm.push(Asm::ASym("SP".into()));
        self.asm.push(Asm::C("M=D"));
        // Restore THAT, THIS, ARG, LCL walking the frame downwards.
        for pointer in SAVED_POINTERS.iter().rev() {
            self.asm.push(Asm::ASym(SCRATCH_ADDR.into()));
            self.asm.push(Asm::C("AM=M-1"));
            self.asm.push(Asm::C("D=M"));
            self.asm.push(Asm::ASym((*pointer).into()));
            self.asm.push(Asm::C("M=D"));
        }
        self.asm.push(Asm::ASym(SCRATCH_RET.into()));
        self.asm.push(Asm::C("A=M"));
        self.asm.push(Asm::C("0;JMP"));
    }

    fn push_d(&mut self) {
        self.asm.push(Asm::ASym("SP".into()));
        self.asm.push(Asm::C("A=M"));
        self.asm.push(Asm::C("M=D"));
        self.asm.push(Asm::ASym("SP".into()));
        self.asm.push(Asm::C("M=M+1"));
    }

    fn pop_to_d(&mut self) {
        self.asm.push(Asm::ASym("SP".into()));
        self.asm.push(Asm::C("AM=M-1"));
        self.asm.push(Asm::C("D=M"));
    }

    fn semantic(&self, parsed: &ParsedLine, message: &str) -> TranslateError {
        TranslateError::Semantic {
            unit: self.labels.current_unit().to_string(),
            line: parsed.line,
            text: parsed.text.clone(),
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::parser::parse;

    fn generate(source: &str) -> Vec<Asm> {
        let mut codegen = CodeGen::new();
        codegen.begin_unit("Test");
        for line in parse("Test", source).unwrap() {
            codegen.emit(&line).unwrap();
        }
        codegen.into_asm()
    }

    fn labels_of(asm: &[Asm]) -> Vec<String> {
        asm.iter()
            .filter_map(|a| match a {
                Asm::Label(name) => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn every_comparison_gets_a_distinct_label_pair() {
        let asm = generate("push constant 1\npush constant 2\neq\nlt\neq");
        let labels = labels_of(&asm);
        assert_eq!(labels.len(), 6);
        let mut unique = labels.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 6);
        assert!(labels.contains(&"Test$eq.0.true".to_string()));
        assert!(labels.contains(&"Test$eq.1.end".to_string()));
        assert!(labels.contains(&"Test$lt.0.true".to_string()));
    }

    #[test]
    fn function_zeroes_each_declared_local() {
        let asm = generate("function Main.main 3");
        assert_eq!(asm[0], Asm::Label("Main.main".into()));
        let zeroed = asm.iter().filter(|a| **a == Asm::C("M=0")).count();
        assert_eq!(zeroed, 3);
    }

    #[test]
    fn flow_labels_are_namespaced_by_function() {
        let asm = generate("function Foo.run 0\nlabel LOOP\ngoto LOOP");
        assert!(asm.contains(&Asm::Label("Foo.run$LOOP".into())));
        assert!(asm.contains(&Asm::ASym("Foo.run$LOOP".into())));
    }

    #[test]
    fn if_goto_pops_and_jumps_on_nonzero() {
        let asm = generate("label END\npush constant 1\nif-goto END");
        assert!(asm.contains(&Asm::C("D;JNE")));
        assert!(asm.contains(&Asm::ASym("Test$END".into())));
    }

    #[test]
    fn call_pushes_return_address_and_saved_pointers_in_order() {
        let asm = generate("call Foo.bar 2");
        let symbols: Vec<&str> = asm
            .iter()
            .filter_map(|a| match a {
                Asm::ASym(s) => Some(s.as_str()),
                _ => None,
            })
            .collect();
        let ret = symbols[0];
        assert_eq!(ret, "Test$ret.0");
        // Saved pointer reads appear in the documented order.
        let order: Vec<&str> = symbols
            .iter()
            .copied()
            .filter(|s| SAVED_POINTERS.contains(s))
            .collect();
        assert_eq!(&order[..4], &SAVED_POINTERS);
        assert_eq!(asm.last(), Some(&Asm::Label("Test$ret.0".into())));
        // ARG is repositioned args + 5 slots below the stack top.
        assert!(asm.contains(&Asm::A(7)));
    }

    #[test]
    fn static_slots_are_scoped_to_the_unit() {
        let asm = generate("push static 3\npop static 3");
        assert!(asm.contains(&Asm::ASym("Test.3".into())));
    }

    #[test]
    fn duplicate_label_in_one_function_is_a_semantic_error() {
        let mut codegen = CodeGen::new();
        codegen.begin_unit("Test");
        let lines = parse("Test", "label A\nlabel A").unwrap();
        codegen.emit(&lines[0]).unwrap();
        let err = codegen.emit(&lines[1]).unwrap_err();
        assert!(matches!(err, TranslateError::Semantic { line: 2, .. }));
    }

    #[test]
    fn same_label_in_two_functions_is_fine() {
        let source = "function A.f 0\nlabel L\nfunction A.g 0\nlabel L";
        let asm = generate(source);
        assert!(asm.contains(&Asm::Label("A.f$L".into())));
        assert!(asm.contains(&Asm::Label("A.g$L".into())));
    }
}
