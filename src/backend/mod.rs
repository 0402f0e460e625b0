pub mod asm;
pub mod codegen;
pub mod labels;
