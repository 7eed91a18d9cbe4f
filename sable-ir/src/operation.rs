//! Operations and regions.

use sable_core::Location;

use crate::{
    attribute::{Attribute, Attributes},
    dialect::builtin,
};

/// A single IR operation.
///
/// Values are identified by name (`%x` is stored as `"x"`); the verifier
/// guarantees names are unique within an isolated scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    /// Fully qualified name, e.g. `add` or `test.sink`.
    pub name: String,
    /// Names of the values this operation defines.
    pub results: Vec<String>,
    /// Names of the values this operation uses.
    pub operands: Vec<String>,
    /// Attribute dictionary.
    pub attributes: Attributes,
    /// Nested regions.
    pub regions: Vec<Region>,
    /// Where the operation starts in the chunk source.
    pub location: Location,
}

/// A single-block region: block arguments plus an operation list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Region {
    pub arguments: Vec<String>,
    pub operations: Vec<Operation>,
}

impl Operation {
    /// Create an operation with no results, operands, attributes or regions.
    pub fn new(name: impl Into<String>, location: Location) -> Self {
        Self {
            name: name.into(),
            results: Vec::new(),
            operands: Vec::new(),
            attributes: Attributes::new(),
            regions: Vec::new(),
            location,
        }
    }

    /// Create an empty top-level module.
    pub fn module() -> Self {
        let mut module = Self::new(builtin::MODULE, Location::new(1, 1));
        module.regions.push(Region::default());
        module
    }

    /// Returns true if this operation is named `name`.
    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }

    /// Look up an attribute.
    pub fn attribute(&self, key: &str) -> Option<&Attribute> {
        self.attributes.get(key)
    }

    /// The symbol this operation defines, if any.
    pub fn symbol_name(&self) -> Option<&str> {
        self.attribute(builtin::SYM_NAME).and_then(Attribute::as_str)
    }

    /// Returns true if the symbol is only visible inside its module.
    pub fn is_private(&self) -> bool {
        self.attribute(builtin::SYM_VISIBILITY)
            .and_then(Attribute::as_str)
            .is_some_and(|v| v == "private")
    }

    /// The first region, if any.
    pub fn body(&self) -> Option<&Region> {
        self.regions.first()
    }

    /// The first region, mutably.
    pub fn body_mut(&mut self) -> Option<&mut Region> {
        self.regions.first_mut()
    }

    /// Visit this operation and everything nested in it, in pre-order.
    pub fn walk<'a>(&'a self, f: &mut dyn FnMut(&'a Operation)) {
        f(self);
        for region in &self.regions {
            for op in &region.operations {
                op.walk(f);
            }
        }
    }

    /// Visit every region nested in this operation, innermost first.
    pub fn walk_regions_mut(&mut self, f: &mut dyn FnMut(&mut Region)) {
        for region in &mut self.regions {
            for op in &mut region.operations {
                op.walk_regions_mut(f);
            }
            f(region);
        }
    }

    /// Count of operations nested inside this one, excluding itself.
    pub fn nested_len(&self) -> usize {
        let mut count = 0;
        self.walk(&mut |_| count += 1);
        count - 1
    }
}

impl Region {
    /// Create a region with the given block arguments.
    pub fn new(arguments: Vec<String>) -> Self {
        Self {
            arguments,
            operations: Vec::new(),
        }
    }

    /// Returns true if the region holds no operations.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn func(name: &str) -> Operation {
        let mut op = Operation::new(builtin::FUNC, Location::new(1, 1));
        op.attributes
            .insert(builtin::SYM_NAME.to_string(), Attribute::Str(name.into()));
        let mut body = Region::default();
        body.operations
            .push(Operation::new(builtin::RETURN, Location::new(2, 3)));
        op.regions.push(body);
        op
    }

    #[test]
    fn test_module_starts_empty() {
        let module = Operation::module();
        assert!(module.is(builtin::MODULE));
        assert!(module.body().unwrap().is_empty());
        assert_eq!(module.nested_len(), 0);
    }

    #[test]
    fn test_walk_is_pre_order() {
        let mut module = Operation::module();
        module.body_mut().unwrap().operations.push(func("f"));
        module.body_mut().unwrap().operations.push(func("g"));

        let mut names = Vec::new();
        module.walk(&mut |op| names.push(op.name.clone()));
        assert_eq!(names, ["module", "func", "return", "func", "return"]);
        assert_eq!(module.nested_len(), 4);
    }

    #[test]
    fn test_symbol_helpers() {
        let mut op = func("f");
        assert_eq!(op.symbol_name(), Some("f"));
        assert!(!op.is_private());

        op.attributes.insert(
            builtin::SYM_VISIBILITY.to_string(),
            Attribute::Str("private".into()),
        );
        assert!(op.is_private());
    }
}
