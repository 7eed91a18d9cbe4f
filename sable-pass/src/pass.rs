//! Pass trait.

use eyre::Result;
use sable_ir::{Context, Operation};

/// A transformation or analysis over one anchor operation.
///
/// Passes are created per pipeline by their registry factory and may be
/// shared across worker threads when a nested pipeline runs in parallel,
/// so they must not rely on interior state tied to one run.
pub trait Pass: Send + Sync {
    /// The registered name of this pass (used in diagnostics, dumps and
    /// instrumentation hooks).
    fn name(&self) -> &'static str;

    /// Run this pass on `op`.
    ///
    /// # Errors
    ///
    /// Returns an error if the pass fails. Passes should emit a located
    /// diagnostic through `ctx` before failing; if they don't, the runner
    /// reports the returned error at `op`.
    fn run(&self, op: &mut Operation, ctx: &Context<'_>) -> Result<()>;
}
