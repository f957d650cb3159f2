pub mod adapter;
pub mod ast;

pub use adapter::{ParsedSelect, SelectParserAdapter};
