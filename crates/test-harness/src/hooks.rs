//! Hook chain and the wrappers that place the orchestrator around it.
//!
//! A host test framework exposes four extension points: before all, before
//! each, after each and after all. [`HookChain`] holds the user's hooks for
//! each of them, in registration order. The wrappers guarantee:
//!
//! - [`with_setup`]: orchestrator setup runs before the first before-each hook.
//! - [`with_teardown`]: orchestrator teardown runs after the last after-each
//!   hook, on every exit path.
//! - [`with_class_teardown`]: final teardown runs after the last after-all
//!   hook, on every exit path.
//!
//! When several steps fail, the first failure is reported and later ones
//! are logged at `warn`. A panicking hook or test body counts as a failure
//! (see [`catch_panic`]), so the teardown steps still run after it.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use anyhow::Result;
use futures::FutureExt;
use tracing::warn;

use switchyard_core::service::BoxFuture;

use crate::error::HarnessError;
use crate::lifecycle::LifecycleState;
use crate::orchestrator::LifecycleOrchestrator;

/// Per-method hook or test body; borrows the fixture for the call.
pub type TestFn<T> = Arc<dyn for<'a> Fn(&'a mut T) -> BoxFuture<'a, Result<()>> + Send + Sync>;

/// Class-level hook without a fixture.
pub type ClassHook = Arc<dyn Fn() -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Ordered user hooks of a test class.
pub struct HookChain<T> {
    before_all: Vec<ClassHook>,
    before_each: Vec<TestFn<T>>,
    after_each: Vec<TestFn<T>>,
    after_all: Vec<ClassHook>,
}

impl<T> Default for HookChain<T> {
    fn default() -> Self {
        Self {
            before_all: Vec::new(),
            before_each: Vec::new(),
            after_each: Vec::new(),
            after_all: Vec::new(),
        }
    }
}

impl<T: Send> HookChain<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn before_all(
        mut self,
        hook: impl Fn() -> BoxFuture<'static, Result<()>> + Send + Sync + 'static,
    ) -> Self {
        self.before_all.push(Arc::new(hook));
        self
    }

    pub fn before_each(
        mut self,
        hook: impl for<'a> Fn(&'a mut T) -> BoxFuture<'a, Result<()>> + Send + Sync + 'static,
    ) -> Self {
        self.before_each.push(Arc::new(hook));
        self
    }

    pub fn after_each(
        mut self,
        hook: impl for<'a> Fn(&'a mut T) -> BoxFuture<'a, Result<()>> + Send + Sync + 'static,
    ) -> Self {
        self.after_each.push(Arc::new(hook));
        self
    }

    pub fn after_all(
        mut self,
        hook: impl Fn() -> BoxFuture<'static, Result<()>> + Send + Sync + 'static,
    ) -> Self {
        self.after_all.push(Arc::new(hook));
        self
    }

    /// Stops at the first failing hook.
    pub async fn run_before_all(&self) -> Result<()> {
        for hook in &self.before_all {
            catch_panic(async { hook().await }).await?;
        }
        Ok(())
    }

    /// Stops at the first failing hook.
    pub async fn run_before_each(&self, fixture: &mut T) -> Result<()> {
        for hook in &self.before_each {
            catch_panic(async { hook(&mut *fixture).await }).await?;
        }
        Ok(())
    }

    /// Runs every hook; reports the first failure.
    pub async fn run_after_each(&self, fixture: &mut T) -> Result<()> {
        let mut outcome = Ok(());
        for hook in &self.after_each {
            let result = catch_panic(async { hook(&mut *fixture).await }).await;
            outcome = compose(outcome, [result]);
        }
        outcome
    }

    /// Runs every hook; reports the first failure.
    pub async fn run_after_all(&self) -> Result<()> {
        let mut outcome = Ok(());
        for hook in &self.after_all {
            let result = catch_panic(async { hook().await }).await;
            outcome = compose(outcome, [result]);
        }
        outcome
    }
}

impl<T> fmt::Debug for HookChain<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookChain")
            .field("before_all", &self.before_all.len())
            .field("before_each", &self.before_each.len())
            .field("after_each", &self.after_each.len())
            .field("after_all", &self.after_all.len())
            .finish()
    }
}

/// Keep the first failure, log the rest.
pub fn compose(primary: Result<()>, rest: impl IntoIterator<Item = Result<()>>) -> Result<()> {
    let mut outcome = primary;
    for next in rest {
        let Err(error) = next else { continue };
        match &outcome {
            Ok(()) => outcome = Err(error),
            Err(first) => warn!(
                error = %error,
                primary = %first,
                "suppressed failure after an earlier failure"
            ),
        }
    }
    outcome
}

/// Await `future`; a panic inside it becomes an error.
pub async fn catch_panic<F>(future: F) -> Result<()>
where
    F: Future<Output = Result<()>>,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(panic_error(payload.as_ref())),
    }
}

fn panic_error(payload: &(dyn Any + Send)) -> anyhow::Error {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_owned());
    anyhow::anyhow!("panicked: {message}")
}

// ─── Wrappers ────────────────────────────────────────────────────────

/// Orchestrator setup, then the before-each hooks.
pub async fn with_setup<T: Send + 'static>(
    orchestrator: &mut LifecycleOrchestrator<T>,
    hooks: &HookChain<T>,
    method: &str,
    fixture: &mut T,
) -> Result<()> {
    orchestrator.setup(method, fixture).await?;
    hooks.run_before_each(fixture).await
}

/// After-each hooks, then orchestrator teardown, composed with `outcome`.
///
/// Teardown only runs if setup succeeded; a failed setup already released
/// what it built.
pub async fn with_teardown<T: Send + 'static>(
    orchestrator: &mut LifecycleOrchestrator<T>,
    hooks: &HookChain<T>,
    method: &str,
    fixture: &mut T,
    outcome: Result<()>,
) -> Result<()> {
    let after = hooks.run_after_each(fixture).await;
    let teardown = if orchestrator.state() == LifecycleState::Active {
        orchestrator
            .teardown(method)
            .await
            .map(|_| ())
            .map_err(|e| HarnessError::from(e).into())
    } else {
        Ok(())
    };
    compose(outcome, [after, teardown])
}

/// After-all hooks, then final teardown, composed with `outcome`.
pub async fn with_class_teardown<T: Send + 'static>(
    orchestrator: &mut LifecycleOrchestrator<T>,
    hooks: &HookChain<T>,
    outcome: Result<()>,
) -> Result<()> {
    let after = hooks.run_after_all().await;
    let teardown = orchestrator
        .final_teardown()
        .await
        .map_err(|e| HarnessError::from(e).into());
    compose(outcome, [after, teardown])
}
