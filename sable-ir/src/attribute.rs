//! Attribute values.

use indexmap::IndexMap;

/// Ordered attribute dictionary; printing preserves insertion order.
pub type Attributes = IndexMap<String, Attribute>;

/// A constant value attached to an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attribute {
    Int(i64),
    Str(String),
    Bool(bool),
    /// Reference to a symbol, written `@name`.
    Symbol(String),
    /// Presence-only flag, written as a bare key in a dictionary.
    Unit,
}

impl Attribute {
    /// The kind of this attribute.
    pub fn kind(&self) -> AttrKind {
        match self {
            Attribute::Int(_) => AttrKind::Int,
            Attribute::Str(_) => AttrKind::Str,
            Attribute::Bool(_) => AttrKind::Bool,
            Attribute::Symbol(_) => AttrKind::Symbol,
            Attribute::Unit => AttrKind::Unit,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Attribute::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Attribute::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Attribute::Symbol(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Attribute::Int(v) => write!(f, "{v}"),
            Attribute::Str(s) => {
                f.write_str("\"")?;
                for c in s.chars() {
                    match c {
                        '"' => f.write_str("\\\"")?,
                        '\\' => f.write_str("\\\\")?,
                        '\n' => f.write_str("\\n")?,
                        '\t' => f.write_str("\\t")?,
                        c => write!(f, "{c}")?,
                    }
                }
                f.write_str("\"")
            }
            Attribute::Bool(b) => write!(f, "{b}"),
            Attribute::Symbol(s) => write!(f, "@{s}"),
            Attribute::Unit => f.write_str("unit"),
        }
    }
}

/// Shape an attribute is required to have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrKind {
    Int,
    Str,
    Bool,
    Symbol,
    Unit,
    /// Any of int, string or bool.
    Literal,
}

impl AttrKind {
    /// Whether `attribute` satisfies this kind.
    pub fn accepts(&self, attribute: &Attribute) -> bool {
        match self {
            AttrKind::Literal => matches!(
                attribute,
                Attribute::Int(_) | Attribute::Str(_) | Attribute::Bool(_)
            ),
            kind => attribute.kind() == *kind,
        }
    }

    /// Human-readable description used in verifier messages.
    pub fn describe(&self) -> &'static str {
        match self {
            AttrKind::Int => "an integer",
            AttrKind::Str => "a string",
            AttrKind::Bool => "a boolean",
            AttrKind::Symbol => "a symbol reference",
            AttrKind::Unit => "a unit flag",
            AttrKind::Literal => "an integer, string or boolean literal",
        }
    }
}
