use std::collections::HashSet;

use eyre::Result;
use sable_ir::{Context, Operation, dialect::builtin};

use crate::{
    pass::Pass,
    registry::{OptionError, PassOptions},
};

/// Erases private functions that no public function can reach through
/// calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct SymbolDce;

impl SymbolDce {
    pub const NAME: &'static str = "symbol-dce";

    pub(crate) fn from_options(_: &mut PassOptions) -> Result<Box<dyn Pass>, OptionError> {
        Ok(Box::new(Self))
    }
}

/// Symbols called from anywhere inside `op`.
fn callees(op: &Operation) -> Vec<String> {
    let mut callees = Vec::new();
    op.walk(&mut |op| {
        if op.is(builtin::CALL)
            && let Some(callee) = op.attribute(builtin::CALLEE).and_then(|a| a.as_symbol())
        {
            callees.push(callee.to_string());
        }
    });
    callees
}

impl Pass for SymbolDce {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn run(&self, op: &mut Operation, _ctx: &Context<'_>) -> Result<()> {
        let Some(body) = op.body_mut() else {
            return Ok(());
        };

        let mut live: HashSet<String> = HashSet::new();
        let mut worklist: Vec<String> = body
            .operations
            .iter()
            .filter(|op| !op.is_private())
            .filter_map(|op| op.symbol_name().map(str::to_string))
            .collect();
        while let Some(symbol) = worklist.pop() {
            if !live.insert(symbol.clone()) {
                continue;
            }
            if let Some(function) = body
                .operations
                .iter()
                .find(|op| op.symbol_name() == Some(symbol.as_str()))
            {
                worklist.extend(callees(function));
            }
        }

        let before = body.operations.len();
        body.operations.retain(|op| match op.symbol_name() {
            Some(symbol) if op.is_private() => live.contains(symbol),
            _ => true,
        });
        tracing::debug!(erased = before - body.operations.len(), "unreachable symbols erased");
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
    fn test_keeps_only_reachable_private_functions() {
        let registry = Arc::new(DialectRegistry::with_defaults());
        let mut sink: Vec<Diagnostic> = Vec::new();
        let ctx = Context::new(Arc::clone(&registry), ContextOptions::default(), &mut sink);
        let mut module = parse(
            "func private @leaf() {}\n\
             func private @mid() {\n  call @leaf()\n  return\n}\n\
             func private @orphan() {\n  call @orphan()\n  return\n}\n\
             func @main() {\n  call @mid()\n  return\n}",
            &ctx,
        )
        .unwrap();

        SymbolDce.run(&mut module, &ctx).unwrap();
        let names: Vec<_> = module
            .body()
            .unwrap()
            .operations
            .iter()
            .filter_map(Operation::symbol_name)
            .collect();
        assert_eq!(names, ["leaf", "mid", "main"]);
        let printed = print(&module, &registry, PrintOptions::default());
        assert!(printed.starts_with("func private @leaf() {}"));
    }
}
