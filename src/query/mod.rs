//! Query language: AST, hand-rolled parser, and SQL predicate builder.

pub mod ast;
pub mod builder;
pub mod parser;

pub use ast::{FieldType, Filter, FilterValue, Node, Operator};
pub use builder::{build, metadata_accessor, CompiledQuery, SqlParam};
pub use parser::parse;
