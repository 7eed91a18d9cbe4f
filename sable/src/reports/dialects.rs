use sable_ir::DialectRegistry;

use super::output::{Output, Report};

/// Registered dialects and their operations.
pub(crate) struct DialectsReport<'a> {
    registry: &'a DialectRegistry,
}

impl<'a> DialectsReport<'a> {
    pub fn new(registry: &'a DialectRegistry) -> Self {
        Self { registry }
    }

    /// One-line header listing the dialect namespaces.
    pub fn header(registry: &DialectRegistry) -> String {
        let names: Vec<_> = registry.dialects().map(|d| d.namespace()).collect();
        format!("Available Dialects: {}", names.join(", "))
    }
}

impl Report for DialectsReport<'_> {
    fn render(&self, out: &mut dyn Output) {
        for (index, dialect) in self.registry.dialects().enumerate() {
            if index > 0 {
                out.newline();
            }
            out.section(dialect.namespace());
            out.key_value_indented("description", dialect.description());
            for op in dialect.ops() {
                out.list_item(&format!("{} - {}", op.name, op.summary));
            }
        }
    }
}
