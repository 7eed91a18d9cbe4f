use eyre::Result;
use sable_ir::{Context, Operation};

use super::erase_dead;
use crate::{
    pass::Pass,
    registry::{OptionError, PassOptions},
};

/// Erases pure operations whose results are never used.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeadCodeElimination;

impl DeadCodeElimination {
    pub const NAME: &'static str = "dce";

    pub(crate) fn from_options(_: &mut PassOptions) -> Result<Box<dyn Pass>, OptionError> {
        Ok(Box::new(Self))
    }
}

impl Pass for DeadCodeElimination {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn run(&self, op: &mut Operation, ctx: &Context<'_>) -> Result<()> {
        let erased = erase_dead(op, ctx.dialects());
        tracing::debug!(erased, "dead operations erased");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use sable_core::Diagnostic;
    use sable_ir::{ContextOptions, DialectRegistry, PrintOptions, parse, print};

    use super::*;

    #[test]
    fn test_erases_transitively_dead_ops() {
        let registry = Arc::new(DialectRegistry::with_defaults());
        let mut sink: Vec<Diagnostic> = Vec::new();
        let ctx = Context::new(Arc::clone(&registry), ContextOptions::default(), &mut sink);
        let mut module = parse(
            "func @f() {\n  %a = const 1\n  %b = add %a, %a\n  %c = test.source\n  %d = mul %c, %c\n  test.sink %c\n  return\n}",
            &ctx,
        )
        .unwrap();

        DeadCodeElimination.run(&mut module, &ctx).unwrap();
        assert_eq!(
            print(&module, &registry, PrintOptions::default()),
            "func @f() {\n  %c = test.source\n  test.sink %c\n  return\n}"
        );
    }
}
