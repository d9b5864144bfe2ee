//! Expression trees and the TreeMap rewrite engine.
//!
//! - `nodes`: the closed set of node kinds (`Expression`)
//! - `mk`: constructors
//! - `treemap`: `TreeMapper` hooks and `TreeMap::apply`
//! - `substitute`: moving a tree from a forked GlobalState into its origin
//! - `show`: `Expression::show_raw`

pub mod nodes;
pub use nodes::*;

pub mod mk;

pub mod treemap;
pub use treemap::{TreeMap, TreeMapper};

pub mod substitute;
pub use substitute::substitute_tree;

mod show;
#[cfg(test)]
#[path = "tests/show_tests.rs"]
mod show_tests;
