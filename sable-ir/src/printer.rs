//! Printer for the IR text format.
//!
//! Registered ops print in their custom form when they have one and their
//! shape allows it; everything else falls back to the generic form. Output
//! parses back to an equivalent module.

use std::fmt::Write;

use crate::{
    attribute::{Attribute, Attributes},
    dialect::{DialectRegistry, Syntax, builtin},
    operation::{Operation, Region},
};

const INDENT: &str = "  ";

/// Printer settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrintOptions {
    /// Print every operation in generic form.
    pub generic: bool,
}

/// Print `op`. A module prints as its top-level operations, one per line,
/// without a trailing newline.
pub fn print(op: &Operation, registry: &DialectRegistry, options: PrintOptions) -> String {
    let printer = Printer {
        registry,
        options,
        elide_regions: false,
    };
    let mut out = String::new();
    if op.is(builtin::MODULE) {
        for (index, child) in op.regions.iter().flat_map(|r| &r.operations).enumerate() {
            if index > 0 {
                out.push('\n');
            }
            printer.operation(&mut out, child, 0);
        }
    } else {
        printer.operation(&mut out, op, 0);
    }
    out
}

/// One-line rendering of `op` with regions elided, used in diagnostics.
pub fn summarize(op: &Operation, registry: &DialectRegistry) -> String {
    if op.is(builtin::MODULE) {
        return builtin::MODULE.to_string();
    }
    let printer = Printer {
        registry,
        options: PrintOptions::default(),
        elide_regions: true,
    };
    let mut out = String::new();
    printer.operation(&mut out, op, 0);
    out
}

struct Printer<'r> {
    registry: &'r DialectRegistry,
    options: PrintOptions,
    elide_regions: bool,
}

impl Printer<'_> {
    fn operation(&self, out: &mut String, op: &Operation, depth: usize) {
        out.push_str(&INDENT.repeat(depth));
        if !op.results.is_empty() {
            out.push_str(&values(&op.results));
            out.push_str(" = ");
        }
        match self.custom_syntax(op) {
            Some(syntax) => self.custom(out, op, syntax, depth),
            None => self.generic(out, op, depth),
        }
    }

    /// The custom syntax `op` can be printed with, if any.
    fn custom_syntax(&self, op: &Operation) -> Option<Syntax> {
        if self.options.generic {
            return None;
        }
        let syntax = self.registry.lookup(&op.name)?.syntax;
        let fits = match syntax {
            Syntax::Generic => false,
            Syntax::Function => {
                op.regions.len() == 1
                    && op.operands.is_empty()
                    && op.results.is_empty()
                    && op.symbol_name().is_some()
                    && op
                        .attribute(builtin::SYM_VISIBILITY)
                        .is_none_or(|v| v.as_str() == Some("private"))
            }
            Syntax::Operands => op.regions.is_empty(),
            Syntax::Constant => {
                op.regions.is_empty()
                    && op.operands.is_empty()
                    && op.attribute(builtin::VALUE).is_some_and(|v| {
                        matches!(v, Attribute::Int(_) | Attribute::Str(_) | Attribute::Bool(_))
                    })
            }
            Syntax::Call => {
                op.regions.is_empty()
                    && op
                        .attribute(builtin::CALLEE)
                        .is_some_and(|v| v.as_symbol().is_some())
            }
        };
        fits.then_some(syntax)
    }

    fn custom(&self, out: &mut String, op: &Operation, syntax: Syntax, depth: usize) {
        out.push_str(&op.name);
        match syntax {
            Syntax::Function => {
                if op.is_private() {
                    out.push_str(" private");
                }
                let name = op.symbol_name().unwrap_or_default();
                let body = &op.regions[0];
                let _ = write!(out, " @{name}({})", values(&body.arguments));
                let extra = without(&op.attributes, &[builtin::SYM_NAME, builtin::SYM_VISIBILITY]);
                if !extra.is_empty() {
                    out.push_str(" attributes ");
                    out.push_str(&attr_dict(&extra));
                }
                out.push(' ');
                self.block(out, &body.operations, depth);
            }
            Syntax::Operands => {
                if !op.operands.is_empty() {
                    out.push(' ');
                    out.push_str(&values(&op.operands));
                }
                self.trailing_attrs(out, &op.attributes);
            }
            Syntax::Constant => {
                if let Some(value) = op.attribute(builtin::VALUE) {
                    let _ = write!(out, " {value}");
                }
                self.trailing_attrs(out, &without(&op.attributes, &[builtin::VALUE]));
            }
            Syntax::Call => {
                if let Some(callee) = op.attribute(builtin::CALLEE) {
                    let _ = write!(out, " {callee}({})", values(&op.operands));
                }
                self.trailing_attrs(out, &without(&op.attributes, &[builtin::CALLEE]));
            }
            Syntax::Generic => {}
        }
    }

    fn trailing_attrs(&self, out: &mut String, attributes: &Attributes) {
        if !attributes.is_empty() {
            out.push(' ');
            out.push_str(&attr_dict(attributes));
        }
    }

    fn generic(&self, out: &mut String, op: &Operation, depth: usize) {
        let _ = write!(out, "\"{}\"({})", op.name, values(&op.operands));
        self.trailing_attrs(out, &op.attributes);
        if op.regions.is_empty() {
            return;
        }
        out.push_str(" (");
        for (index, region) in op.regions.iter().enumerate() {
            if index > 0 {
                out.push_str(", ");
            }
            self.region(out, region, depth);
        }
        out.push(')');
    }

    fn region(&self, out: &mut String, region: &Region, depth: usize) {
        if region.arguments.is_empty() {
            self.block(out, &region.operations, depth);
            return;
        }
        let _ = write!(out, "{{ ^({}):", values(&region.arguments));
        if self.elide_regions {
            out.push_str(" ... }");
        } else if region.operations.is_empty() {
            out.push_str(" }");
        } else {
            self.body(out, &region.operations, depth);
        }
    }

    /// `{ ops }` where the opening brace is already positioned.
    fn block(&self, out: &mut String, operations: &[Operation], depth: usize) {
        if self.elide_regions {
            out.push_str("{...}");
        } else if operations.is_empty() {
            out.push_str("{}");
        } else {
            out.push('{');
            self.body(out, operations, depth);
        }
    }

    /// Nested operations, one per line, then the closing brace.
    fn body(&self, out: &mut String, operations: &[Operation], depth: usize) {
        for op in operations {
            out.push('\n');
            self.operation(out, op, depth + 1);
        }
        out.push('\n');
        out.push_str(&INDENT.repeat(depth));
        out.push('}');
    }
}

fn values(names: &[String]) -> String {
    names
        .iter()
        .map(|name| format!("%{name}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn without(attributes: &Attributes, keys: &[&str]) -> Attributes {
    attributes
        .iter()
        .filter(|(key, _)| !keys.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn attr_dict(attributes: &Attributes) -> String {
    let entries: Vec<String> = attributes
        .iter()
        .map(|(key, value)| match value {
            Attribute::Unit => key.clone(),
            value => format!("{key} = {value}"),
        })
        .collect();
    format!("{{{}}}", entries.join(", "))
}

#[cfg(test)]
mod tests {
    use sable_core::Location;

    use super::*;

    fn func(name: &str, arguments: &[&str]) -> Operation {
        let mut op = Operation::new(builtin::FUNC, Location::new(1, 1));
        op.attributes
            .insert(builtin::SYM_NAME.to_string(), Attribute::Str(name.into()));
        op.regions.push(Region::new(
            arguments.iter().map(|a| a.to_string()).collect(),
        ));
        op
    }

    fn op(name: &str, results: &[&str], operands: &[&str]) -> Operation {
        let mut op = Operation::new(name, Location::new(1, 1));
        op.results = results.iter().map(|r| r.to_string()).collect();
        op.operands = operands.iter().map(|o| o.to_string()).collect();
        op
    }

    fn sample() -> Operation {
        let mut constant = op(builtin::CONST, &["0"], &[]);
        constant
            .attributes
            .insert(builtin::VALUE.to_string(), Attribute::Int(2));

        let mut f = func("f", &["a"]);
        let body = f.body_mut().unwrap();
        body.operations.push(constant);
        body.operations.push(op(builtin::ADD, &["1"], &["a", "0"]));
        body.operations.push(op(builtin::RETURN, &[], &["1"]));

        let mut module = Operation::module();
        module.body_mut().unwrap().operations.push(f);
        module.body_mut().unwrap().operations.push(func("g", &[]));
        module
    }

    #[test]
    fn test_custom_form() {
        let registry = DialectRegistry::with_defaults();
        insta::assert_snapshot!(print(&sample(), &registry, PrintOptions::default()), @r"
        func @f(%a) {
          %0 = const 2
          %1 = add %a, %0
          return %1
        }
        func @g() {}
        ");
    }

    #[test]
    fn test_generic_form() {
        let registry = DialectRegistry::with_defaults();
        insta::assert_snapshot!(print(&sample(), &registry, PrintOptions { generic: true }), @r#"
        "func"() {sym_name = "f"} ({ ^(%a):
          %0 = "const"() {value = 2}
          %1 = "add"(%a, %0)
          "return"(%1)
        })
        "func"() {sym_name = "g"} ({})
        "#);
    }

    #[test]
    fn test_function_attributes() {
        let registry = DialectRegistry::with_defaults();
        let mut f = func("h", &[]);
        f.attributes.insert(
            builtin::SYM_VISIBILITY.to_string(),
            Attribute::Str("private".into()),
        );
        f.attributes.insert("inline".to_string(), Attribute::Unit);
        assert_eq!(
            print(&f, &registry, PrintOptions::default()),
            "func private @h() attributes {inline} {}"
        );
    }

    #[test]
    fn test_falls_back_to_generic() {
        let registry = DialectRegistry::with_defaults();
        let constant = op(builtin::CONST, &["0"], &[]);
        assert_eq!(
            print(&constant, &registry, PrintOptions::default()),
            "%0 = \"const\"()"
        );

        let unknown = op("foo.bar", &[], &["x"]);
        assert_eq!(
            print(&unknown, &registry, PrintOptions::default()),
            "\"foo.bar\"(%x)"
        );
    }

    #[test]
    fn test_summarize_elides_regions() {
        let registry = DialectRegistry::with_defaults();
        let module = sample();
        let f = &module.body().unwrap().operations[0];
        assert_eq!(summarize(f, &registry), "func @f(%a) {...}");
        assert_eq!(summarize(&module, &registry), "module");

        let mut sink = op("test.sink", &[], &["a"]);
        sink.attributes
            .insert("tag".to_string(), Attribute::Str("x".into()));
        assert_eq!(summarize(&sink, &registry), "test.sink %a {tag = \"x\"}");
    }
}
