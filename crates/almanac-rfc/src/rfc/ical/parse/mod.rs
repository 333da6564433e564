//! Line-structure parsing: unfolding, content lines and component nesting.

pub mod error;
pub mod lexer;
pub mod parser;
pub mod values;

pub use parser::parse;
