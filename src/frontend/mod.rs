pub mod diagnostic;
pub mod instruction;
pub mod parser;
