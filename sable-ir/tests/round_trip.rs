//! Printed IR parses back to the same module, in both forms.

use std::sync::Arc;

use sable_core::Diagnostic;
use sable_ir::{Context, ContextOptions, DialectRegistry, Operation, PrintOptions, parse, print};

const PROGRAM: &str = r#"
// Helpers first.
func private @scale(%x, %k) attributes {inline} {
  %0 = mul %x, %k
  return %0
}

func @main() {
  %a = test.source
  %two = const 2
  %label = const "twice" {note = true}
  %r = call @scale(%a, %two)
  test.sink %r, %label {test.remark = "done"}
  return
}
"#;

fn parse_text(src: &str, options: ContextOptions) -> Operation {
    let mut sink: Vec<Diagnostic> = Vec::new();
    let module = {
        let ctx = Context::new(Arc::new(DialectRegistry::with_defaults()), options, &mut sink);
        parse(src, &ctx)
    };
    assert!(sink.is_empty(), "unexpected diagnostics: {sink:?}");
    module.expect("input should parse")
}

/// Locations differ between the original and the reprint, so compare the
/// printed text instead of the trees.
fn assert_round_trips(src: &str, options: ContextOptions, print_options: PrintOptions) {
    let registry = DialectRegistry::with_defaults();
    let first = print(&parse_text(src, options), &registry, print_options);
    let second = print(&parse_text(&first, options), &registry, print_options);
    assert_eq!(first, second);
}

#[test]
fn test_custom_form_round_trips() {
    assert_round_trips(PROGRAM, ContextOptions::default(), PrintOptions::default());
}

#[test]
fn test_generic_form_round_trips() {
    assert_round_trips(PROGRAM, ContextOptions::default(), PrintOptions { generic: true });
}

#[test]
fn test_generic_output_reads_back_as_custom() {
    let registry = DialectRegistry::with_defaults();
    let module = parse_text(PROGRAM, ContextOptions::default());
    let generic = print(&module, &registry, PrintOptions { generic: true });
    let reparsed = parse_text(&generic, ContextOptions::default());
    assert_eq!(
        print(&reparsed, &registry, PrintOptions::default()),
        print(&module, &registry, PrintOptions::default())
    );
}

#[test]
fn test_unregistered_ops_round_trip() {
    let options = ContextOptions {
        allow_unregistered: true,
        ..ContextOptions::default()
    };
    assert_round_trips(
        "%0, %1 = \"foo.pair\"() {seed = -4}\n\"foo.scope\"(%0) ({ ^(%i):\n  \"foo.use\"(%i, %1)\n}, {})\n",
        options,
        PrintOptions::default(),
    );
}

#[test]
fn test_printed_program() {
    let registry = DialectRegistry::with_defaults();
    let module = parse_text(PROGRAM, ContextOptions::default());
    insta::assert_snapshot!(print(&module, &registry, PrintOptions::default()), @r#"
    func private @scale(%x, %k) attributes {inline} {
      %0 = mul %x, %k
      return %0
    }
    func @main() {
      %a = test.source
      %two = const 2
      %label = const "twice" {note = true}
      %r = call @scale(%a, %two)
      test.sink %r, %label {test.remark = "done"}
      return
    }
    "#);
}
