use sable_pass::PassRegistry;

use super::output::{Output, Report};

/// Registered passes with their options.
pub(crate) struct PassesReport<'a> {
    registry: &'a PassRegistry,
}

impl<'a> PassesReport<'a> {
    pub fn new(registry: &'a PassRegistry) -> Self {
        Self { registry }
    }
}

impl Report for PassesReport<'_> {
    fn render(&self, out: &mut dyn Output) {
        for (index, pass) in self.registry.passes().enumerate() {
            if index > 0 {
                out.newline();
            }
            out.section(pass.name);
            out.key_value_indented("summary", pass.summary);
            if let Some(anchor) = pass.anchor {
                out.key_value_indented("runs on", anchor);
            }
            for option in pass.options {
                out.list_item(&format!("{} - {}", option.name, option.description));
            }
        }
    }
}
