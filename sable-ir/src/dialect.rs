//! Dialects and operation definitions.
//!
//! A dialect is a namespace of operation definitions. Operations named
//! `ns.op` belong to dialect `ns`; unprefixed names belong to `builtin`.

use indexmap::IndexMap;

use crate::attribute::AttrKind;

/// Names used by the builtin dialect.
pub mod builtin {
    pub const NAMESPACE: &str = "builtin";

    pub const MODULE: &str = "module";
    pub const FUNC: &str = "func";
    pub const RETURN: &str = "return";
    pub const CONST: &str = "const";
    pub const ADD: &str = "add";
    pub const MUL: &str = "mul";
    pub const CALL: &str = "call";

    pub const SYM_NAME: &str = "sym_name";
    pub const SYM_VISIBILITY: &str = "sym_visibility";
    pub const VALUE: &str = "value";
    pub const CALLEE: &str = "callee";
}

/// Number of operands or results an operation accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match self {
            Arity::Exact(n) => count == *n,
            Arity::AtLeast(n) => count >= *n,
        }
    }

    /// The count in the constraint, exact or minimum.
    pub fn bound(&self) -> usize {
        match self {
            Arity::Exact(n) | Arity::AtLeast(n) => *n,
        }
    }
}

impl std::fmt::Display for Arity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "{n}"),
            Arity::AtLeast(n) => write!(f, "at least {n}"),
        }
    }
}

/// Custom assembly form of a registered operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syntax {
    /// Only the quoted generic form.
    Generic,
    /// `func [private] @name(%args) [attributes {...}] { ... }`
    Function,
    /// `name %a, %b [{...}]`, operands on the same line as the name.
    Operands,
    /// `name <literal> [{...}]`, literal stored as `value`.
    Constant,
    /// `name @callee(%args) [{...}]`
    Call,
}

/// Definition of a registered operation.
#[derive(Debug, Clone, Copy)]
pub struct OpDefinition {
    pub name: &'static str,
    pub summary: &'static str,
    pub syntax: Syntax,
    pub operands: Arity,
    pub results: Arity,
    pub regions: usize,
    /// Free of side effects; removable when its results are unused.
    pub pure: bool,
    /// Must be the last operation of a function body.
    pub terminator: bool,
    /// Regions cannot see values defined outside the operation.
    pub isolated: bool,
    pub required: &'static [(&'static str, AttrKind)],
}

impl OpDefinition {
    /// A definition with no operands, results, regions or traits.
    pub const fn new(name: &'static str, summary: &'static str) -> Self {
        Self {
            name,
            summary,
            syntax: Syntax::Generic,
            operands: Arity::Exact(0),
            results: Arity::Exact(0),
            regions: 0,
            pure: false,
            terminator: false,
            isolated: false,
            required: &[],
        }
    }

    pub const fn syntax(mut self, syntax: Syntax) -> Self {
        self.syntax = syntax;
        self
    }

    pub const fn operands(mut self, operands: Arity) -> Self {
        self.operands = operands;
        self
    }

    pub const fn results(mut self, results: Arity) -> Self {
        self.results = results;
        self
    }

    pub const fn regions(mut self, regions: usize) -> Self {
        self.regions = regions;
        self
    }

    pub const fn pure(mut self) -> Self {
        self.pure = true;
        self
    }

    pub const fn terminator(mut self) -> Self {
        self.terminator = true;
        self
    }

    pub const fn isolated(mut self) -> Self {
        self.isolated = true;
        self
    }

    pub const fn required(mut self, required: &'static [(&'static str, AttrKind)]) -> Self {
        self.required = required;
        self
    }
}

/// A namespace of operation definitions.
#[derive(Debug, Clone)]
pub struct Dialect {
    namespace: &'static str,
    description: &'static str,
    ops: IndexMap<&'static str, OpDefinition>,
}

impl Dialect {
    pub fn new(namespace: &'static str, description: &'static str) -> Self {
        Self {
            namespace,
            description,
            ops: IndexMap::new(),
        }
    }

    /// Add an operation definition.
    pub fn op(mut self, definition: OpDefinition) -> Self {
        self.ops.insert(definition.name, definition);
        self
    }

    pub fn namespace(&self) -> &'static str {
        self.namespace
    }

    pub fn description(&self) -> &'static str {
        self.description
    }

    /// Definitions in registration order.
    pub fn ops(&self) -> impl Iterator<Item = &OpDefinition> {
        self.ops.values()
    }

    /// The builtin dialect: modules, functions and integer arithmetic.
    pub fn builtin() -> Self {
        use builtin::*;

        Dialect::new(NAMESPACE, "Modules, functions and integer arithmetic")
            .op(OpDefinition::new(MODULE, "Top-level container")
                .regions(1)
                .isolated())
            .op(OpDefinition::new(FUNC, "Function definition")
                .syntax(Syntax::Function)
                .regions(1)
                .isolated()
                .required(&[(SYM_NAME, AttrKind::Str)]))
            .op(OpDefinition::new(RETURN, "Return from the enclosing function")
                .syntax(Syntax::Operands)
                .operands(Arity::AtLeast(0))
                .terminator())
            .op(OpDefinition::new(CONST, "Materialize a constant")
                .syntax(Syntax::Constant)
                .results(Arity::Exact(1))
                .pure()
                .required(&[(VALUE, AttrKind::Literal)]))
            .op(OpDefinition::new(ADD, "Integer addition")
                .syntax(Syntax::Operands)
                .operands(Arity::Exact(2))
                .results(Arity::Exact(1))
                .pure())
            .op(OpDefinition::new(MUL, "Integer multiplication")
                .syntax(Syntax::Operands)
                .operands(Arity::Exact(2))
                .results(Arity::Exact(1))
                .pure())
            .op(OpDefinition::new(CALL, "Call a function by symbol")
                .syntax(Syntax::Call)
                .operands(Arity::AtLeast(0))
                .results(Arity::AtLeast(0))
                .required(&[(CALLEE, AttrKind::Symbol)]))
    }

    /// The test dialect: opaque producers and consumers of values.
    pub fn test() -> Self {
        Dialect::new("test", "Opaque value producers and consumers for tests")
            .op(OpDefinition::new("test.source", "Produce an opaque value")
                .syntax(Syntax::Operands)
                .results(Arity::Exact(1)))
            .op(OpDefinition::new("test.sink", "Consume values with side effects")
                .syntax(Syntax::Operands)
                .operands(Arity::AtLeast(0)))
    }
}

/// The set of dialects known to a processing context.
#[derive(Debug, Clone, Default)]
pub struct DialectRegistry {
    dialects: IndexMap<&'static str, Dialect>,
}

impl DialectRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the builtin and test dialects.
    pub fn with_defaults() -> Self {
        Self::new().register(Dialect::builtin()).register(Dialect::test())
    }

    /// Add a dialect, replacing any dialect with the same namespace.
    pub fn register(mut self, dialect: Dialect) -> Self {
        self.dialects.insert(dialect.namespace, dialect);
        self
    }

    /// Look up a dialect by namespace.
    pub fn dialect(&self, namespace: &str) -> Option<&Dialect> {
        self.dialects.get(namespace)
    }

    /// Registered dialects in registration order.
    pub fn dialects(&self) -> impl Iterator<Item = &Dialect> {
        self.dialects.values()
    }

    /// Look up the definition of an operation by full name.
    pub fn lookup(&self, op_name: &str) -> Option<&OpDefinition> {
        self.dialect(namespace_of(op_name))?.ops.get(op_name)
    }
}

/// The dialect namespace an operation name belongs to.
pub fn namespace_of(op_name: &str) -> &str {
    op_name
        .split_once('.')
        .map_or(builtin::NAMESPACE, |(namespace, _)| namespace)
}
