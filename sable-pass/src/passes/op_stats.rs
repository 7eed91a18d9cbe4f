use eyre::Result;
use indexmap::IndexMap;
use sable_core::Severity;
use sable_ir::{Context, Operation};

use crate::{
    pass::Pass,
    registry::{OptionError, PassOptions},
};

/// Emits a remark at the anchor op counting the operations nested in it.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrintOpStats;

impl PrintOpStats {
    pub const NAME: &'static str = "print-op-stats";

    pub(crate) fn from_options(_: &mut PassOptions) -> Result<Box<dyn Pass>, OptionError> {
        Ok(Box::new(Self))
    }
}

/// Per-name counts of the operations nested in `op`, sorted by name.
pub(crate) fn op_counts(op: &Operation) -> IndexMap<String, usize> {
    let mut counts: IndexMap<String, usize> = IndexMap::new();
    op.walk(&mut |nested| {
        if !std::ptr::eq(nested, op) {
            *counts.entry(nested.name.clone()).or_default() += 1;
        }
    });
    counts.sort_keys();
    counts
}

impl Pass for PrintOpStats {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn run(&self, op: &mut Operation, ctx: &Context<'_>) -> Result<()> {
        let counts = op_counts(op);
        let summary = if counts.is_empty() {
            "none".to_string()
        } else {
            counts
                .iter()
                .map(|(name, count)| format!("{name}: {count}"))
                .collect::<Vec<_>>()
                .join(", ")
        };
        ctx.emit_at(op, Severity::Remark, format!("operation counts: {summary}"));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use sable_core::{Diagnostic, Location};
    use sable_ir::{ContextOptions, DialectRegistry, parse};

    use super::*;

    #[test]
    fn test_remark_lists_sorted_counts() {
        let mut sink: Vec<Diagnostic> = Vec::new();
        {
            let ctx = Context::new(
                Arc::new(DialectRegistry::with_defaults()),
                ContextOptions::default(),
                &mut sink,
            );
            let mut module = parse(
                "func @f() {\n  %a = test.source\n  %b = add %a, %a\n  %c = add %b, %a\n  test.sink %c\n  return\n}",
                &ctx,
            )
            .unwrap();
            PrintOpStats.run(&mut module, &ctx).unwrap();
        }
        assert_eq!(sink.len(), 1);
        assert_eq!(sink[0].severity, Severity::Remark);
        assert_eq!(sink[0].location, Location::new(1, 1));
        assert_eq!(
            sink[0].message,
            "operation counts: add: 2, func: 1, return: 1, test.sink: 1, test.source: 1"
        );
    }
}
