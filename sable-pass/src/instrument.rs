//! Pass instrumentation hooks.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
    thread::ThreadId,
    time::{Duration, Instant},
};

use indexmap::IndexMap;
use sable_ir::{Context, Operation, PrintOptions, print};

/// Receives callbacks around every pass the runner executes.
///
/// Hooks may be called from several threads at once when a nested pipeline
/// runs in parallel.
///
/// # Example
///
/// ```ignore
/// struct CountingInstrumentation(AtomicUsize);
///
/// impl Instrumentation for CountingInstrumentation {
///     fn name(&self) -> &'static str { "counting" }
///
///     fn after_pass(&self, _pass: &str, _op: &Operation, _ctx: &Context<'_>) {
///         self.0.fetch_add(1, Ordering::Relaxed);
///     }
/// }
/// ```
pub trait Instrumentation: Send + Sync {
    /// The name of this instrumentation (for logging).
    fn name(&self) -> &'static str;

    /// Called before a pass runs on `op`.
    #[allow(unused_variables)]
    fn before_pass(&self, pass: &str, op: &Operation) {}

    /// Called after a pass completes successfully on `op`.
    #[allow(unused_variables)]
    fn after_pass(&self, pass: &str, op: &Operation, ctx: &Context<'_>) {}

    /// Called after a pass fails on `op`.
    #[allow(unused_variables)]
    fn after_pass_failed(&self, pass: &str, op: &Operation) {}

    /// Whether nested pipelines must run on one thread while this is
    /// installed. Instrumentation whose output is order sensitive returns
    /// true.
    fn requires_serial(&self) -> bool {
        false
    }
}

/// Shared handles let the owner read results back after the run.
impl<T: Instrumentation> Instrumentation for Arc<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn before_pass(&self, pass: &str, op: &Operation) {
        (**self).before_pass(pass, op);
    }

    fn after_pass(&self, pass: &str, op: &Operation, ctx: &Context<'_>) {
        (**self).after_pass(pass, op, ctx);
    }

    fn after_pass_failed(&self, pass: &str, op: &Operation) {
        (**self).after_pass_failed(pass, op);
    }

    fn requires_serial(&self) -> bool {
        (**self).requires_serial()
    }
}

/// Records a printed copy of the IR after every successful pass.
///
/// Dumps are recorded in execution order, so installing this forces
/// nested pipelines onto one thread.
#[derive(Debug, Default)]
pub struct IrPrinter {
    options: PrintOptions,
    dumps: Mutex<Vec<String>>,
}

impl IrPrinter {
    pub fn new(options: PrintOptions) -> Self {
        Self {
            options,
            dumps: Mutex::new(Vec::new()),
        }
    }

    /// Take the dumps recorded so far, concatenated.
    pub fn take(&self) -> String {
        let mut dumps = self.dumps.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *dumps).concat()
    }
}

impl Instrumentation for IrPrinter {
    fn name(&self) -> &'static str {
        "ir-printer"
    }

    fn requires_serial(&self) -> bool {
        true
    }

    fn after_pass(&self, pass: &str, op: &Operation, ctx: &Context<'_>) {
        let dump = format!(
            "// *** IR Dump After {pass} ***\n{}\n",
            print(op, ctx.dialects(), self.options)
        );
        self.dumps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(dump);
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct PassTime {
    runs: usize,
    total: Duration,
}

/// Accumulates wall-clock time per pass name.
#[derive(Debug, Default)]
pub struct PassTiming {
    started: Mutex<HashMap<ThreadId, Vec<Instant>>>,
    times: Mutex<IndexMap<String, PassTime>>,
}

impl PassTiming {
    pub fn new() -> Self {
        Self::default()
    }

    fn stop(&self, pass: &str) {
        let started = self
            .started
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(&std::thread::current().id())
            .and_then(Vec::pop);
        let Some(started) = started else {
            return;
        };
        let mut times = self.times.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = times.entry(pass.to_string()).or_default();
        entry.runs += 1;
        entry.total += started.elapsed();
    }

    /// Total time and run count per pass, in first-run order.
    pub fn totals(&self) -> Vec<(String, usize, Duration)> {
        self.times
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(pass, time)| (pass.clone(), time.runs, time.total))
            .collect()
    }

    /// Render the timing report.
    pub fn report(&self) -> String {
        let totals = self.totals();
        let grand: Duration = totals.iter().map(|(_, _, total)| *total).sum();
        let mut out = String::from("===- Pass execution timing report -===\n");
        for (pass, runs, total) in &totals {
            out.push_str(&format!(
                "  {:>10.3} ms  {runs:>4}x  {pass}\n",
                total.as_secs_f64() * 1000.0
            ));
        }
        out.push_str(&format!(
            "  {:>10.3} ms         total\n",
            grand.as_secs_f64() * 1000.0
        ));
        out
    }
}

impl Instrumentation for PassTiming {
    fn name(&self) -> &'static str {
        "pass-timing"
    }

    fn before_pass(&self, _pass: &str, _op: &Operation) {
        self.started
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(std::thread::current().id())
            .or_default()
            .push(Instant::now());
    }

    fn after_pass(&self, pass: &str, _op: &Operation, _ctx: &Context<'_>) {
        self.stop(pass);
    }

    fn after_pass_failed(&self, pass: &str, _op: &Operation) {
        self.stop(pass);
    }
}
