//! Sandboxed execution of PAC scripts
//!
//! A script runs in a `boa_engine` context that holds the ECMAScript
//! built-ins and the PAC helpers, nothing else: no module loader, no
//! console, no filesystem or process objects.
//!
//! Every call to [`ScriptHost::invoke`] builds a fresh context on a worker
//! thread and re-runs the script's top level, so nothing a script stores in
//! a global survives from one evaluation to the next, and a loaded host can
//! be shared across threads. Runtime limits stop simple runaway loops and
//! recursion; a wall-clock budget bounds everything else, including nested
//! loops and regex backtracking.

mod bindings;

use crate::clock::{Clock, ClockSource};
use crate::config::SandboxLimits;
use crate::error::{PacError, Result};
use crate::helpers::{HostResolver, SystemResolver};
use boa_engine::vm::RuntimeLimits;
use boa_engine::{Context, JsObject, JsString, JsValue, Source};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use tracing::{debug, info};

const ENTRY_POINT: &str = "FindProxyForURL";

const WORKER_STACK_SIZE: usize = 8 * 1024 * 1024;

/// PAC source text together with where it was loaded from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacScript {
    pub source: String,
    pub origin: String,
}

impl PacScript {
    pub fn new(source: impl Into<String>, origin: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            origin: origin.into(),
        }
    }
}

/// Host capabilities and limits given to a script
#[derive(Debug, Clone)]
pub struct SandboxOptions {
    pub clock: Arc<dyn Clock>,
    pub resolver: Arc<dyn HostResolver>,
    pub limits: SandboxLimits,
}

impl Default for SandboxOptions {
    fn default() -> Self {
        Self {
            clock: Arc::new(ClockSource::system()),
            resolver: Arc::new(SystemResolver),
            limits: SandboxLimits::default(),
        }
    }
}

/// A compiled-and-checked PAC script ready for evaluation
#[derive(Debug)]
pub struct ScriptHost {
    sandbox: Arc<Sandbox>,
}

impl ScriptHost {
    /// Run the script's top level once and check it defines the entry point.
    ///
    /// Syntax errors and exceptions thrown at the top level are
    /// [`PacError::Compile`]; a script without a callable `FindProxyForURL`
    /// is [`PacError::MissingEntryPoint`].
    pub fn load(script: PacScript, options: SandboxOptions) -> Result<Self> {
        let sandbox = Arc::new(Sandbox { script, options });

        run_bounded(&sandbox, |sandbox| {
            let mut context = sandbox.context().map_err(PacError::Compile)?;
            sandbox.entry_point(&mut context).map(|_| ())
        })?;

        info!("Loaded PAC script from {}", sandbox.script.origin);
        Ok(Self { sandbox })
    }

    /// Call `FindProxyForURL(url, host)` and return its result as a string
    pub fn invoke(&self, url: &str, host: &str) -> Result<String> {
        debug!("Evaluating {}({:?}, {:?})", ENTRY_POINT, url, host);

        let (url, host) = (url.to_string(), host.to_string());
        let result = run_bounded(&self.sandbox, move |sandbox| sandbox.call(&url, &host))?;

        debug!("{} returned {:?}", ENTRY_POINT, result);
        Ok(result)
    }
}

/// Run `task` on its own thread and wait at most the wall-clock budget.
///
/// The engine has no way to interrupt a running script, so a task that
/// overruns keeps its thread until it finishes or hits a runtime limit; the
/// caller gets [`PacError::Timeout`] and moves on.
fn run_bounded<T, F>(sandbox: &Arc<Sandbox>, task: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&Sandbox) -> Result<T> + Send + 'static,
{
    let budget = sandbox.options.limits.eval_timeout();
    let worker_sandbox = Arc::clone(sandbox);
    let (tx, rx) = mpsc::channel();

    thread::Builder::new()
        .name("pac-eval".to_string())
        .stack_size(WORKER_STACK_SIZE)
        .spawn(move || {
            // The receiver is gone if the budget already ran out
            let _ = tx.send(task(&worker_sandbox));
        })
        .map_err(|e| PacError::Runtime(format!("failed to start evaluation thread: {e}")))?;

    match rx.recv_timeout(budget) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => {
            debug!("Abandoning PAC evaluation after {:?}", budget);
            Err(PacError::Timeout(budget))
        }
        Err(RecvTimeoutError::Disconnected) => {
            Err(PacError::Runtime("evaluation thread panicked".to_string()))
        }
    }
}

/// Script and capabilities shared with evaluation threads
#[derive(Debug)]
struct Sandbox {
    script: PacScript,
    options: SandboxOptions,
}

impl Sandbox {
    /// Fresh context with limits, helpers and the script's top level evaluated
    fn context(&self) -> std::result::Result<Context, String> {
        let mut context = Context::default();

        let mut limits = RuntimeLimits::default();
        limits.set_loop_iteration_limit(self.options.limits.loop_iteration_limit);
        limits.set_recursion_limit(self.options.limits.recursion_limit);
        limits.set_stack_size_limit(self.options.limits.stack_size_limit);
        context.set_runtime_limits(limits);

        bindings::register(&mut context, &self.options.clock, &self.options.resolver)
            .map_err(|e| e.to_string())?;

        context
            .eval(Source::from_bytes(self.script.source.as_bytes()))
            .map_err(|e| e.to_string())?;

        Ok(context)
    }

    fn entry_point(&self, context: &mut Context) -> Result<JsObject> {
        let global = context.global_object();
        let value = global
            .get(JsString::from(ENTRY_POINT), context)
            .map_err(|e| PacError::Runtime(e.to_string()))?;

        value
            .as_callable()
            .cloned()
            .ok_or(PacError::MissingEntryPoint)
    }

    fn call(&self, url: &str, host: &str) -> Result<String> {
        let mut context = self.context().map_err(PacError::Runtime)?;
        let entry_point = self.entry_point(&mut context)?;

        let args = [
            JsValue::from(JsString::from(url)),
            JsValue::from(JsString::from(host)),
        ];
        let result = entry_point
            .call(&JsValue::undefined(), &args, &mut context)
            .map_err(|e| PacError::Runtime(e.to_string()))?;

        if result.is_null_or_undefined() {
            return Err(PacError::EmptyResult);
        }

        Ok(result
            .to_string(&mut context)
            .map_err(|e| PacError::Runtime(e.to_string()))?
            .to_std_string_escaped())
    }
}
