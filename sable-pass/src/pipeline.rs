//! Pipeline building and execution.

use miette::SourceSpan;
use sable_core::Diagnostic;
use sable_ir::{Context, Operation, dialect::builtin, verify};

use crate::{
    error::{BuildError, PipelineSource, RunError},
    instrument::Instrumentation,
    pass::Pass,
    registry::{OptionError, PassOptions, PassRegistry},
    spec::{ElementSpec, OptionSpec, parse_pipeline},
};

/// One step of a pipeline.
enum Element {
    /// Run a pass on the current anchor op.
    Pass(Box<dyn Pass>),
    /// Run a nested pipeline on each matching child op.
    Nested(PassPipeline),
}

impl std::fmt::Debug for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Element::Pass(pass) => f.debug_tuple("Pass").field(&pass.name()).finish(),
            Element::Nested(pipeline) => f.debug_tuple("Nested").field(pipeline).finish(),
        }
    }
}

/// A resolved, immutable pass pipeline anchored on an operation name.
///
/// Only [`PipelineRunner::build`] creates one, so every pipeline that runs
/// has been validated.
///
/// ```compile_fail
/// let pipeline = sable_pass::PassPipeline::new("module");
/// ```
#[derive(Debug)]
pub struct PassPipeline {
    anchor: String,
    elements: Vec<Element>,
}

impl PassPipeline {
    fn new(anchor: &str) -> Self {
        Self {
            anchor: anchor.to_string(),
            elements: Vec::new(),
        }
    }

    /// Render back to pipeline text, without pass options.
    pub fn describe(&self) -> String {
        self.elements
            .iter()
            .map(|element| match element {
                Element::Pass(pass) => pass.name().to_string(),
                Element::Nested(nested) => format!("{}({})", nested.anchor, nested.describe()),
            })
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Builds pass pipelines from text and runs them on modules.
///
/// # Example
///
/// ```ignore
/// let runner = PipelineRunner::new()
///     .verify_each(true)
///     .instrument(PassTiming::new());
///
/// let pipeline = PipelineRunner::build("func(canonicalize),symbol-dce", &passes, &ctx)?;
/// runner.run(&pipeline, &mut module, &ctx)?;
/// ```
pub struct PipelineRunner {
    verify_each: bool,
    instruments: Vec<Box<dyn Instrumentation>>,
}

impl PipelineRunner {
    /// Create a runner with no instrumentation and per-pass verification
    /// off.
    pub fn new() -> Self {
        Self {
            verify_each: false,
            instruments: Vec::new(),
        }
    }

    /// Verify the anchor op after every pass.
    pub fn verify_each(mut self, enable: bool) -> Self {
        self.verify_each = enable;
        self
    }

    /// Add an instrumentation to receive pass hooks.
    pub fn instrument(mut self, instrumentation: impl Instrumentation + 'static) -> Self {
        self.instruments.push(Box::new(instrumentation));
        self
    }

    /// Resolve pipeline text into a runnable pipeline anchored on
    /// `module`.
    ///
    /// Every pass name, option and anchor is checked before this returns;
    /// no module is touched.
    ///
    /// # Errors
    ///
    /// Returns a [`BuildError`] pointing into `text` at the first problem.
    pub fn build(
        text: &str,
        registry: &PassRegistry,
        ctx: &Context<'_>,
    ) -> Result<PassPipeline, Box<BuildError>> {
        let source = PipelineSource::new(text);
        let mut elements = parse_pipeline(text, &source)?;

        // `module(...)` as the only element is the same as no wrapper.
        let wrapped = matches!(
            elements.as_slice(),
            [ElementSpec::Nested { anchor, .. }] if anchor == builtin::MODULE
        );
        if wrapped && let Some(ElementSpec::Nested { elements: inner, .. }) = elements.pop() {
            elements = inner;
        }

        let builder = Builder {
            registry,
            ctx,
            source: &source,
        };
        let pipeline = builder.pipeline(builtin::MODULE, elements)?;
        tracing::debug!(pipeline = %pipeline.describe(), "pass pipeline built");
        Ok(pipeline)
    }

    /// Run `pipeline` on `module`.
    ///
    /// # Errors
    ///
    /// Returns the first failure. The failure has already been reported
    /// through `ctx` as one or more diagnostics.
    pub fn run(
        &self,
        pipeline: &PassPipeline,
        module: &mut Operation,
        ctx: &Context<'_>,
    ) -> Result<(), RunError> {
        let serial = self.instruments.iter().find(|i| i.requires_serial());
        let _serial = serial.map(|instrument| {
            tracing::debug!(
                instrumentation = instrument.name(),
                "nested pipelines run serially"
            );
            ctx.disable_multithreading()
        });
        self.run_pipeline(pipeline, module, ctx)
    }

    fn run_pipeline(
        &self,
        pipeline: &PassPipeline,
        op: &mut Operation,
        ctx: &Context<'_>,
    ) -> Result<(), RunError> {
        for element in &pipeline.elements {
            match element {
                Element::Pass(pass) => self.run_pass(pass.as_ref(), op, ctx)?,
                Element::Nested(nested) => self.run_nested(nested, op, ctx)?,
            }
        }
        Ok(())
    }

    fn run_pass(
        &self,
        pass: &dyn Pass,
        op: &mut Operation,
        ctx: &Context<'_>,
    ) -> Result<(), RunError> {
        let name = pass.name();
        let _span = tracing::debug_span!("pass", pass = name, op = %op.name).entered();

        for instrument in &self.instruments {
            instrument.before_pass(name, op);
        }

        let errors_before = ctx.error_count();
        if let Err(report) = pass.run(op, ctx) {
            tracing::debug!(error = %report, "pass failed");
            if ctx.error_count() == errors_before {
                ctx.emit(ctx.op_error(op, format!("pass '{name}' failed: {report}")));
            }
            for instrument in &self.instruments {
                instrument.after_pass_failed(name, op);
            }
            return Err(RunError::PassFailed {
                pass: name.to_string(),
                reason: report.to_string(),
            });
        }

        for instrument in &self.instruments {
            instrument.after_pass(name, op, ctx);
        }

        if self.verify_each {
            let violations = verify(op, ctx);
            if !violations.is_empty() {
                tracing::debug!(count = violations.len(), "verification failed after pass");
                for mut diagnostic in violations {
                    diagnostic.attach_note(
                        op.location,
                        format!("invariant violated after running pass '{name}'"),
                    );
                    ctx.emit(diagnostic);
                }
                return Err(RunError::VerificationFailed {
                    pass: name.to_string(),
                });
            }
        }
        tracing::debug!("pass finished");
        Ok(())
    }

    /// Run `nested` on every direct child of `op` named after its anchor.
    ///
    /// Every target is attempted; the first failure is returned.
    fn run_nested(
        &self,
        nested: &PassPipeline,
        op: &mut Operation,
        ctx: &Context<'_>,
    ) -> Result<(), RunError> {
        let targets: Vec<&mut Operation> = op
            .regions
            .iter_mut()
            .flat_map(|region| region.operations.iter_mut())
            .filter(|child| child.is(&nested.anchor))
            .collect();

        let results = if ctx.is_multithreading_enabled() && targets.len() > 1 {
            self.run_parallel(nested, targets, ctx)
        } else {
            targets
                .into_iter()
                .map(|target| self.run_pipeline(nested, target, ctx))
                .collect()
        };

        results.into_iter().find_map(Result::err).map_or(Ok(()), Err)
    }

    /// Run `nested` on each target in its own thread and forked context,
    /// then replay the buffered diagnostics in target order.
    fn run_parallel(
        &self,
        nested: &PassPipeline,
        targets: Vec<&mut Operation>,
        ctx: &Context<'_>,
    ) -> Vec<Result<(), RunError>> {
        tracing::debug!(
            targets = targets.len(),
            anchor = %nested.anchor,
            "running nested pipeline in parallel"
        );
        let mut buffers: Vec<Vec<Diagnostic>> = targets.iter().map(|_| Vec::new()).collect();

        let results = std::thread::scope(|scope| {
            let handles: Vec<_> = targets
                .into_iter()
                .zip(buffers.iter_mut())
                .map(|(target, buffer)| {
                    let child = ctx.fork(buffer);
                    let span = tracing::Span::current();
                    scope.spawn(move || {
                        let _entered = span.entered();
                        self.run_pipeline(nested, target, &child)
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(|handle| {
                    handle.join().unwrap_or_else(|_| {
                        Err(RunError::PassFailed {
                            pass: nested.describe(),
                            reason: "worker thread panicked".to_string(),
                        })
                    })
                })
                .collect::<Vec<_>>()
        });

        for diagnostic in buffers.into_iter().flatten() {
            ctx.emit(diagnostic);
        }
        results
    }
}

impl Default for PipelineRunner {
    fn default() -> Self {
        Self::new()
    }
}

struct Builder<'a, 'c, 's> {
    registry: &'a PassRegistry,
    ctx: &'c Context<'s>,
    source: &'a PipelineSource,
}

impl Builder<'_, '_, '_> {
    fn pipeline(
        &self,
        anchor: &str,
        elements: Vec<ElementSpec>,
    ) -> Result<PassPipeline, Box<BuildError>> {
        let mut pipeline = PassPipeline::new(anchor);
        for element in elements {
            let element = match element {
                ElementSpec::Pass {
                    name,
                    span,
                    options,
                } => Element::Pass(self.pass(anchor, name, span, options)?),
                ElementSpec::Nested {
                    anchor: nested,
                    span,
                    elements,
                } => {
                    let valid = nested != builtin::MODULE
                        && self
                            .ctx
                            .dialects()
                            .lookup(&nested)
                            .is_some_and(|d| d.regions > 0);
                    if !valid {
                        return Err(self.source.unknown_anchor(nested, span));
                    }
                    Element::Nested(self.pipeline(&nested, elements)?)
                }
            };
            pipeline.elements.push(element);
        }
        Ok(pipeline)
    }

    fn pass(
        &self,
        anchor: &str,
        name: String,
        span: SourceSpan,
        options: Vec<OptionSpec>,
    ) -> Result<Box<dyn Pass>, Box<BuildError>> {
        let Some(info) = self.registry.get(&name) else {
            return Err(self.source.unknown_pass(name, span));
        };
        if let Some(required) = info.anchor
            && required != anchor
        {
            return Err(self.source.anchor_mismatch(name, required, anchor, span));
        }

        let mut pass_options = PassOptions::new();
        for option in options {
            pass_options.insert(option.key, option.value, option.span);
        }
        (info.factory)(&mut pass_options)
            .and_then(|pass| pass_options.finish().map(|()| pass))
            .map_err(|error| match error {
                OptionError::Unknown { option, span } => {
                    self.source
                        .unknown_option(&name, option, &info.option_names(), span)
                }
                OptionError::Invalid {
                    option,
                    reason,
                    span,
                } => self.source.invalid_option(&name, option, reason, span),
            })
    }
}
