//! The parser boundary and code emission: lexer, tagged-variant AST, parser,
//! scope scanner, and printer. The scanner fills per-module symbol tables and
//! import/export records; everything cross-module happens in the core crate.

pub mod ast;
mod lexer;
pub use lexer::Lexer;
mod token;
pub use token::{Token, TokenKind};
mod parser;
pub use parser::Parser;
mod scanner;
pub use scanner::{scan, ScanOptions, ScanResult, StatementPart};
mod side_effects;
pub use side_effects::{expr_is_pure, stmt_has_side_effects};
mod printer;
pub use printer::{
  quote_string, PrintOptions, PrintedRef, Printer, RecordTarget, SymbolResolver, VerbatimResolver,
};
