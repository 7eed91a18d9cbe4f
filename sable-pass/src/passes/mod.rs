//! Built-in passes.
//!
//! - `canonicalize` - fold constant arithmetic and erase dead pure ops
//! - `dce` - erase pure ops whose results are unused
//! - `symbol-dce` - erase private functions nothing reaches
//! - `print-op-stats` - emit a remark with per-op counts
//! - `test-*` - passes that fail, break invariants or emit diagnostics on
//!   request, used to exercise the driver itself

mod canonicalize;
mod dce;
mod op_stats;
mod symbol_dce;
mod testing;

use std::collections::HashSet;

use sable_ir::{DialectRegistry, Operation, Region};

pub use canonicalize::Canonicalize;
pub use dce::DeadCodeElimination;
pub use op_stats::PrintOpStats;
pub use symbol_dce::SymbolDce;
pub use testing::{DropTerminators, EmitDiagnostics, FailPass};

use crate::registry::{PassInfo, PassOptionInfo};

/// Every built-in pass, in `--list-passes` order.
pub const BUILTIN: &[PassInfo] = &[
    PassInfo {
        name: Canonicalize::NAME,
        summary: "Fold constant arithmetic and erase dead pure operations",
        anchor: None,
        options: &[PassOptionInfo {
            name: "max-iterations",
            description: "Upper bound on rewrite sweeps (default 10)",
        }],
        factory: Canonicalize::from_options,
    },
    PassInfo {
        name: DeadCodeElimination::NAME,
        summary: "Erase pure operations whose results are unused",
        anchor: None,
        options: &[],
        factory: DeadCodeElimination::from_options,
    },
    PassInfo {
        name: SymbolDce::NAME,
        summary: "Erase private functions unreachable from public ones",
        anchor: Some("module"),
        options: &[],
        factory: SymbolDce::from_options,
    },
    PassInfo {
        name: PrintOpStats::NAME,
        summary: "Emit a remark counting operations by name",
        anchor: None,
        options: &[],
        factory: PrintOpStats::from_options,
    },
    PassInfo {
        name: FailPass::NAME,
        summary: "Fail without changing anything",
        anchor: None,
        options: &[],
        factory: FailPass::from_options,
    },
    PassInfo {
        name: DropTerminators::NAME,
        summary: "Remove function terminators, leaving invalid IR",
        anchor: None,
        options: &[],
        factory: DropTerminators::from_options,
    },
    PassInfo {
        name: EmitDiagnostics::NAME,
        summary: "Emit diagnostics requested by test.error/test.warning/test.remark/test.note attributes",
        anchor: None,
        options: &[],
        factory: EmitDiagnostics::from_options,
    },
];

/// Names of every value used as an operand anywhere under `op`.
fn used_values(op: &Operation) -> HashSet<String> {
    let mut used = HashSet::new();
    op.walk(&mut |op| used.extend(op.operands.iter().cloned()));
    used
}

/// Whether `op` can be erased when its results are unused.
fn is_trivially_dead(op: &Operation, registry: &DialectRegistry, used: &HashSet<String>) -> bool {
    op.regions.is_empty()
        && registry.lookup(&op.name).is_some_and(|d| d.pure)
        && op.results.iter().all(|r| !used.contains(r))
}

/// Erase trivially dead ops under `op` until none are left. Returns the
/// number erased.
fn erase_dead(op: &mut Operation, registry: &DialectRegistry) -> usize {
    let mut erased = 0;
    loop {
        let used = used_values(op);
        let mut removed = 0;
        op.walk_regions_mut(&mut |region: &mut Region| {
            let before = region.operations.len();
            region
                .operations
                .retain(|op| !is_trivially_dead(op, registry, &used));
            removed += before - region.operations.len();
        });
        if removed == 0 {
            return erased;
        }
        erased += removed;
    }
}
