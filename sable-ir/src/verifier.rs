//! Structural verifier.
//!
//! Checks an operation tree against the registered op definitions, SSA
//! scoping and symbol rules. Violations are returned as error diagnostics
//! instead of emitted so callers can decorate them first.

use std::collections::HashMap;

use sable_core::{Diagnostic, Location};

use crate::{
    context::Context,
    dialect::{OpDefinition, Syntax, builtin},
    operation::{Operation, Region},
};

/// Verify `op` and everything nested in it.
///
/// Call targets are only checked when `op` is a module, since a function
/// on its own has no symbol table to resolve against.
pub fn verify(op: &Operation, ctx: &Context<'_>) -> Vec<Diagnostic> {
    let mut verifier = Verifier {
        ctx,
        violations: Vec::new(),
    };
    let mut scope = Scope::default();
    verifier.operation(op, &mut scope);
    if op.is(builtin::MODULE) {
        verifier.symbols(op);
    }
    verifier.violations
}

/// Values visible at a point in a region, with where each was defined.
#[derive(Debug, Clone, Default)]
struct Scope {
    values: HashMap<String, Location>,
}

struct Verifier<'c, 's> {
    ctx: &'c Context<'s>,
    violations: Vec<Diagnostic>,
}

impl Verifier<'_, '_> {
    fn error(&mut self, op: &Operation, message: String) {
        let diagnostic = self.ctx.op_error(op, message);
        self.violations.push(diagnostic);
    }

    fn define(&mut self, op: &Operation, name: &str, scope: &mut Scope) {
        if let Some(previous) = scope.values.get(name) {
            let diagnostic = self
                .ctx
                .op_error(op, format!("redefinition of value '%{name}'"))
                .with_note(*previous, "previous definition here");
            self.violations.push(diagnostic);
        } else {
            scope.values.insert(name.to_string(), op.location);
        }
    }

    fn operation(&mut self, op: &Operation, scope: &mut Scope) {
        let definition = self.ctx.dialects().lookup(&op.name).copied();
        match &definition {
            Some(definition) => self.shape(op, definition),
            None if !self.ctx.allows_unregistered() => {
                self.error(op, format!("unregistered operation '{}'", op.name));
            }
            None => {}
        }

        let mut reported = Vec::new();
        for operand in &op.operands {
            if !scope.values.contains_key(operand) && !reported.contains(&operand) {
                reported.push(operand);
                self.error(op, format!("use of undefined value '%{operand}'"));
            }
        }

        let isolated = definition.is_some_and(|d| d.isolated);
        let function = definition.is_some_and(|d| d.syntax == Syntax::Function);
        for region in &op.regions {
            let mut inner = if isolated {
                Scope::default()
            } else {
                scope.clone()
            };
            self.region(op, region, &mut inner, function);
        }

        for result in &op.results {
            self.define(op, result, scope);
        }
    }

    fn region(&mut self, parent: &Operation, region: &Region, scope: &mut Scope, function: bool) {
        for argument in &region.arguments {
            self.define(parent, argument, scope);
        }

        let last = region.operations.len().saturating_sub(1);
        for (index, op) in region.operations.iter().enumerate() {
            let misplaced = self
                .ctx
                .dialects()
                .lookup(&op.name)
                .is_some_and(|d| d.terminator)
                && !(function && index == last);
            if misplaced {
                self.error(
                    op,
                    format!("'{}' op must be the last operation in a function body", op.name),
                );
            }
            self.operation(op, scope);
        }

        if function
            && let Some(last) = region.operations.last()
            && !self
                .ctx
                .dialects()
                .lookup(&last.name)
                .is_some_and(|d| d.terminator)
        {
            self.error(
                parent,
                format!("'{}' op body must end with a terminator operation", parent.name),
            );
        }
    }

    fn shape(&mut self, op: &Operation, definition: &OpDefinition) {
        let name = &op.name;
        if !definition.operands.accepts(op.operands.len()) {
            self.error(
                op,
                format!(
                    "'{name}' op requires {} {} but got {}",
                    definition.operands,
                    plural("operand", definition.operands.bound()),
                    op.operands.len()
                ),
            );
        }
        if !definition.results.accepts(op.results.len()) {
            self.error(
                op,
                format!(
                    "'{name}' op requires {} {} but got {}",
                    definition.results,
                    plural("result", definition.results.bound()),
                    op.results.len()
                ),
            );
        }
        if op.regions.len() != definition.regions {
            self.error(
                op,
                format!(
                    "'{name}' op requires {} {} but got {}",
                    definition.regions,
                    plural("region", definition.regions),
                    op.regions.len()
                ),
            );
        }
        for (key, kind) in definition.required {
            match op.attribute(key) {
                None => self.error(op, format!("'{name}' op requires attribute '{key}'")),
                Some(attribute) if !kind.accepts(attribute) => self.error(
                    op,
                    format!("'{name}' op attribute '{key}' must be {}", kind.describe()),
                ),
                Some(_) => {}
            }
        }
    }

    /// Symbol uniqueness and call resolution within a module.
    fn symbols(&mut self, module: &Operation) {
        let mut table: HashMap<&str, &Operation> = HashMap::new();
        for op in module.regions.iter().flat_map(|r| &r.operations) {
            let Some(symbol) = op.symbol_name() else {
                continue;
            };
            if let Some(previous) = table.get(symbol) {
                let diagnostic = self
                    .ctx
                    .op_error(op, format!("redefinition of symbol '@{symbol}'"))
                    .with_note(previous.location, "previous definition here");
                self.violations.push(diagnostic);
            } else {
                table.insert(symbol, op);
            }
        }

        let mut calls = Vec::new();
        module.walk(&mut |op| {
            if op.is(builtin::CALL) {
                calls.push(op);
            }
        });
        for call in calls {
            let Some(callee) = call.attribute(builtin::CALLEE).and_then(|a| a.as_symbol()) else {
                continue;
            };
            match table.get(callee) {
                None => self.error(
                    call,
                    format!("'call' op references undefined symbol '@{callee}'"),
                ),
                Some(target) => {
                    let expected = target.body().map_or(0, |body| body.arguments.len());
                    if expected != call.operands.len() {
                        self.error(
                            call,
                            format!(
                                "'call' op passes {} operands but '@{callee}' expects {expected}",
                                call.operands.len()
                            ),
                        );
                    }
                }
            }
        }
    }
}

fn plural(noun: &str, count: usize) -> String {
    if count == 1 {
        noun.to_string()
    } else {
        format!("{noun}s")
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        attribute::Attribute, context::ContextOptions, dialect::DialectRegistry, parse,
    };

    fn violations(src: &str) -> Vec<Diagnostic> {
        let mut sink: Vec<Diagnostic> = Vec::new();
        {
            let ctx = Context::new(
                Arc::new(DialectRegistry::with_defaults()),
                ContextOptions::default(),
                &mut sink,
            );
            let _ = parse(src, &ctx);
        }
        sink
    }

    fn messages(src: &str) -> Vec<String> {
        violations(src).into_iter().map(|d| d.message).collect()
    }

    #[test]
    fn test_valid_module() {
        assert!(messages(
            "func @f(%a) {\n  %0 = const 1\n  %1 = add %a, %0\n  return %1\n}\nfunc @g() {}"
        )
        .is_empty());
    }

    #[test]
    fn test_operand_arity() {
        assert_eq!(
            messages("func @f(%a) {\n  %0 = add %a\n  return\n}"),
            ["'add' op requires 2 operands but got 1"]
        );
    }

    #[test]
    fn test_result_arity() {
        assert_eq!(
            messages("func @f() {\n  const 1\n  return\n}"),
            ["'const' op requires 1 result but got 0"]
        );
    }

    #[test]
    fn test_region_arity_is_singular_for_one() {
        let messages = messages("\"func\"() {sym_name = \"f\"}");
        assert!(
            messages.contains(&"'func' op requires 1 region but got 0".to_string()),
            "{messages:?}"
        );
    }

    #[test]
    fn test_required_attribute() {
        assert_eq!(
            messages("func @f() {\n  %0 = \"const\"()\n  return\n}"),
            ["'const' op requires attribute 'value'"]
        );
        assert_eq!(
            messages("func @f() {\n  %0 = \"const\"() {value = @f}\n  return\n}"),
            ["'const' op attribute 'value' must be an integer, string or boolean literal"]
        );
    }

    #[test]
    fn test_terminators() {
        assert_eq!(
            messages("func @f() {\n  return\n  %0 = test.source\n}"),
            [
                "'return' op must be the last operation in a function body",
                "'func' op body must end with a terminator operation",
            ]
        );
        assert_eq!(
            messages("return"),
            ["'return' op must be the last operation in a function body"]
        );
    }

    #[test]
    fn test_redefinition_has_note() {
        let diagnostics =
            violations("func @f() {\n  %0 = test.source\n  %0 = test.source\n  return\n}");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message, "redefinition of value '%0'");
        assert_eq!(diagnostics[0].location, Location::new(3, 8));
        assert_eq!(diagnostics[0].notes[0].message, "previous definition here");
        assert_eq!(diagnostics[0].notes[0].location, Location::new(2, 8));
    }

    #[test]
    fn test_functions_are_isolated() {
        assert_eq!(
            messages("%0 = test.source\nfunc @f() {\n  test.sink %0\n  return\n}"),
            ["use of undefined value '%0'"]
        );
    }

    #[test]
    fn test_symbols() {
        assert_eq!(
            messages("func @f() {}\nfunc @f() {}"),
            ["redefinition of symbol '@f'"]
        );
        assert_eq!(
            messages("func @f() {\n  call @g()\n  return\n}"),
            ["'call' op references undefined symbol '@g'"]
        );
        assert_eq!(
            messages("func @g(%x) {\n  return\n}\nfunc @f() {\n  call @g()\n  return\n}"),
            ["'call' op passes 0 operands but '@g' expects 1"]
        );
    }

    #[test]
    fn test_function_alone_skips_call_resolution() {
        let mut func = Operation::new(builtin::FUNC, Location::new(1, 1));
        func.attributes
            .insert(builtin::SYM_NAME.to_string(), Attribute::Str("f".into()));
        let mut body = Region::default();
        let mut call = Operation::new(builtin::CALL, Location::new(2, 3));
        call.attributes
            .insert(builtin::CALLEE.to_string(), Attribute::Symbol("missing".into()));
        body.operations.push(call);
        body.operations
            .push(Operation::new(builtin::RETURN, Location::new(3, 3)));
        func.regions.push(body);

        let mut sink: Vec<Diagnostic> = Vec::new();
        let ctx = Context::new(
            Arc::new(DialectRegistry::with_defaults()),
            ContextOptions::default(),
            &mut sink,
        );
        assert!(verify(&func, &ctx).is_empty());
    }
}
