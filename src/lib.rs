//! quill: shared analysis state and tree rewriting for a static analysis
//! front end.
//!
//! - [`quill_core`]: name and symbol interning, `GlobalState`, freeze guards,
//!   `deep_copy` and `GlobalSubstitution`
//! - [`quill_ast`]: expression trees and the `TreeMap` rewrite engine
//! - [`pipeline`]: runs a pass over many files on forked states and merges
//!   the results back into one canonical state
//! - [`tracing_config`]: env-driven subscriber setup

pub use quill_ast;
pub use quill_core;

pub use quill_ast::{Expression, TreeMap, TreeMapper, substitute_tree};
pub use quill_core::{
    GlobalState, GlobalSubstitution, MutableContext, NameRef, SymbolRef, UnfreezeFileTable,
    UnfreezeNameTable, UnfreezeSymbolTable,
};

pub mod pipeline;
pub use pipeline::{CompilationUnit, Pipeline, PipelineOptions};

pub mod tracing_config;
