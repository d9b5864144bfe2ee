//! Parallel fork/merge over compilation units.
//!
//! Workers never share a mutable GlobalState. Each batch of units runs
//! against its own `deep_copy` of the canonical state with names and
//! symbols unfrozen; afterwards the coordinating thread folds every fork
//! back in batch order, so the canonical tables only ever see one writer.
//!
//! ```text
//!              canonical (frozen, shared read-only)
//!             /            |             \
//!        fork 0         fork 1   ...   fork N-1      (rayon)
//!     pass(unit..)   pass(unit..)    pass(unit..)
//!             \            |             /
//!      GlobalSubstitution + substitute_tree, in order (coordinator)
//! ```

use quill_ast::{Expression, substitute_tree};
use quill_core::{
    FileRef, GlobalState, GlobalSubstitution, MutableContext, Symbols, UnfreezeNameTable,
    UnfreezeSymbolTable,
};
use rayon::prelude::*;
use tracing::{Level, Span, debug, span};

const WORKERS_VAR: &str = "QUILL_WORKERS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Number of forks (and batches) a run creates. Never zero.
    pub workers: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        PipelineOptions {
            workers: rayon::current_num_threads().max(1),
        }
    }
}

impl PipelineOptions {
    pub fn with_workers(workers: usize) -> Self {
        PipelineOptions {
            workers: workers.max(1),
        }
    }

    /// `QUILL_WORKERS` when it is a positive integer, otherwise the default.
    pub fn from_env() -> Self {
        std::env::var(WORKERS_VAR)
            .ok()
            .and_then(|value| value.trim().parse::<usize>().ok())
            .filter(|&workers| workers > 0)
            .map(PipelineOptions::with_workers)
            .unwrap_or_default()
    }
}

/// One file's tree, as handed to a pass.
#[derive(Debug, PartialEq)]
pub struct CompilationUnit {
    pub file: FileRef,
    pub tree: Expression,
}

impl CompilationUnit {
    pub fn new(file: FileRef, tree: Expression) -> Self {
        CompilationUnit { file, tree }
    }
}

/// What one worker hands back: its fork and the rewritten trees.
struct BatchResult {
    fork: GlobalState,
    trees: Vec<Expression>,
}

pub struct Pipeline {
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(options: PipelineOptions) -> Self {
        Pipeline { options }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Run `pass` over every unit and return the rewritten trees in input
    /// order, with every handle valid against `canonical`.
    ///
    /// Files must already be entered in `canonical`. A panic inside `pass`
    /// propagates before any fork is merged, leaving `canonical` untouched.
    pub fn run<P>(
        &self,
        canonical: &mut GlobalState,
        units: Vec<CompilationUnit>,
        pass: P,
    ) -> Vec<Expression>
    where
        P: Fn(&mut MutableContext<'_>, Expression) -> Expression + Sync,
    {
        if units.is_empty() {
            return Vec::new();
        }

        let total = units.len();
        let batches = split_batches(units, self.options.workers);
        let run_span = span!(
            Level::INFO,
            "pipeline",
            units = total,
            batches = batches.len()
        );
        let _entered = run_span.enter();

        let source: &GlobalState = canonical;
        let results: Vec<BatchResult> = batches
            .into_par_iter()
            .enumerate()
            .map(|(index, batch)| run_batch(&run_span, source, index, batch, &pass))
            .collect();

        let _merge = span!(Level::DEBUG, "merge", batches = results.len()).entered();
        let mut trees = Vec::with_capacity(total);
        for BatchResult { fork, trees: rewritten } in results {
            let subst = GlobalSubstitution::new(&fork, canonical);
            let mut ctx = MutableContext::new(canonical, Symbols::root(), FileRef::NONE);
            trees.extend(
                rewritten
                    .into_iter()
                    .map(|tree| substitute_tree(&mut ctx, &subst, tree)),
            );
        }
        debug!(
            names = canonical.names_used(),
            symbols = canonical.symbols_used(),
            "merged all forks"
        );
        if cfg!(debug_assertions) {
            canonical.sanity_check();
        }
        trees
    }
}

/// Split into at most `workers` contiguous, non-empty batches whose sizes
/// differ by at most one.
fn split_batches(units: Vec<CompilationUnit>, workers: usize) -> Vec<Vec<CompilationUnit>> {
    let count = workers.clamp(1, units.len().max(1));
    let base = units.len() / count;
    let extra = units.len() % count;

    let mut units = units.into_iter();
    (0..count)
        .map(|i| {
            let size = base + usize::from(i < extra);
            units.by_ref().take(size).collect()
        })
        .collect()
}

fn run_batch<P>(
    parent: &Span,
    canonical: &GlobalState,
    index: usize,
    batch: Vec<CompilationUnit>,
    pass: &P,
) -> BatchResult
where
    P: Fn(&mut MutableContext<'_>, Expression) -> Expression + Sync,
{
    let _span = span!(
        parent: parent,
        Level::DEBUG,
        "worker_batch",
        batch = index,
        units = batch.len()
    )
    .entered();

    let mut fork = canonical.deep_copy();
    let mut trees = Vec::with_capacity(batch.len());
    {
        let mut names = UnfreezeNameTable::new(&mut fork);
        let mut symbols = UnfreezeSymbolTable::new(&mut names);
        for unit in batch {
            let mut ctx = MutableContext::new(&mut symbols, Symbols::root(), unit.file);
            trees.push(pass(&mut ctx, unit.tree));
        }
    }
    debug!(
        names = fork.names_used(),
        symbols = fork.symbols_used(),
        "batch finished"
    );
    BatchResult { fork, trees }
}

#[cfg(test)]
#[path = "tests/pipeline_batch_tests.rs"]
mod pipeline_batch_tests;
