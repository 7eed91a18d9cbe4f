use std::collections::HashMap;

use eyre::Result;
use sable_ir::{Attribute, Context, Operation, Region, dialect::builtin};

use super::erase_dead;
use crate::{
    pass::Pass,
    registry::{OptionError, PassOptions},
};

const DEFAULT_MAX_ITERATIONS: usize = 10;

/// Folds `add` and `mul` of integer constants and erases dead pure ops,
/// repeating until nothing changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Canonicalize {
    max_iterations: usize,
}

impl Canonicalize {
    pub const NAME: &'static str = "canonicalize";

    pub fn new(max_iterations: usize) -> Self {
        Self { max_iterations }
    }

    pub(crate) fn from_options(options: &mut PassOptions) -> Result<Box<dyn Pass>, OptionError> {
        let span = options.span("max-iterations");
        let max_iterations = options
            .take_parsed::<usize>("max-iterations")?
            .unwrap_or(DEFAULT_MAX_ITERATIONS);
        if max_iterations == 0
            && let Some(span) = span
        {
            return Err(OptionError::Invalid {
                option: "max-iterations".to_string(),
                reason: "must be at least 1".to_string(),
                span,
            });
        }
        Ok(Box::new(Self::new(max_iterations)))
    }
}

impl Default for Canonicalize {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ITERATIONS)
    }
}

impl Pass for Canonicalize {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn run(&self, op: &mut Operation, ctx: &Context<'_>) -> Result<()> {
        for iteration in 1..=self.max_iterations {
            let mut folded = 0;
            op.walk_regions_mut(&mut |region| folded += fold_constants(region));
            let erased = erase_dead(op, ctx.dialects());
            tracing::trace!(iteration, folded, erased, "canonicalize sweep");
            if folded + erased == 0 {
                return Ok(());
            }
        }
        tracing::debug!(
            max_iterations = self.max_iterations,
            "canonicalize stopped before reaching a fixpoint"
        );
        Ok(())
    }
}

/// Replace arithmetic on known constants in `region` with the result.
/// Returns the number of ops folded.
fn fold_constants(region: &mut Region) -> usize {
    let mut constants: HashMap<String, i64> = HashMap::new();
    let mut folded = 0;

    for op in &mut region.operations {
        if op.results.len() != 1 {
            continue;
        }
        if op.is(builtin::CONST) {
            if let Some(value) = op.attribute(builtin::VALUE).and_then(Attribute::as_int) {
                constants.insert(op.results[0].clone(), value);
            }
            continue;
        }

        let fold: fn(i64, i64) -> Option<i64> = if op.is(builtin::ADD) {
            i64::checked_add
        } else if op.is(builtin::MUL) {
            i64::checked_mul
        } else {
            continue;
        };
        let [lhs, rhs] = op.operands.as_slice() else {
            continue;
        };
        let (Some(&lhs), Some(&rhs)) = (constants.get(lhs), constants.get(rhs)) else {
            continue;
        };
        let Some(value) = fold(lhs, rhs) else {
            continue;
        };

        let mut constant = Operation::new(builtin::CONST, op.location);
        constant.results = std::mem::take(&mut op.results);
        constant
            .attributes
            .insert(builtin::VALUE.to_string(), Attribute::Int(value));
        constants.insert(constant.results[0].clone(), value);
        *op = constant;
        folded += 1;
    }
    folded
}

#[cfg(test)]
mod tests {
    use sable_core::Location;

    use super::*;

    fn op(name: &str, results: &[&str], operands: &[&str]) -> Operation {
        let mut op = Operation::new(name, Location::new(1, 1));
        op.results = results.iter().map(|r| r.to_string()).collect();
        op.operands = operands.iter().map(|o| o.to_string()).collect();
        op
    }

    fn constant(result: &str, value: i64) -> Operation {
        let mut op = op(builtin::CONST, &[result], &[]);
        op.attributes
            .insert(builtin::VALUE.to_string(), Attribute::Int(value));
        op
    }

    #[test]
    fn test_folds_chains() {
        let mut region = Region::default();
        region.operations = vec![
            constant("a", 2),
            constant("b", 3),
            op(builtin::ADD, &["c"], &["a", "b"]),
            op(builtin::MUL, &["d"], &["c", "c"]),
        ];
        assert_eq!(fold_constants(&mut region), 2);
        assert_eq!(region.operations[3], constant("d", 25));
    }

    #[test]
    fn test_skips_overflow_and_unknowns() {
        let mut region = Region::default();
        region.operations = vec![
            constant("a", i64::MAX),
            op("test.source", &["b"], &[]),
            op(builtin::ADD, &["c"], &["a", "a"]),
            op(builtin::ADD, &["d"], &["a", "b"]),
        ];
        assert_eq!(fold_constants(&mut region), 0);
    }
}
