//! Filter condition compiler for organizational unit definitions.
//!
//! Turns a flat list of UI filter conditions into the bucketed query
//! document the search API stores, and back:
//!
//! ```text
//! rows ──parse──▶ FilterCondition[] ──compile──▶ QueryDocument ──to_wire──▶ JSON
//! JSON ──from_wire──▶ QueryDocument ──decompile(catalog)──▶ FilterCondition[] ──to_rows──▶ rows
//! ```

pub mod condition;
pub mod wire;
pub mod rows;
pub mod resolver;
pub mod sanitize;
pub mod document;
pub mod compiler;
pub mod decompiler;
pub mod config;

pub use compiler::{compile, CompileError, ConditionCompiler};
pub use condition::{ConditionValue, CustomFieldRecord, FilterCondition, Operator};
pub use decompiler::{decompile, ConditionDecompiler};
pub use document::{DocumentError, QueryDocument};
pub use resolver::{BucketKind, FieldKeyRegistry};
