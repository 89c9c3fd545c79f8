//! Debugger marker with a breakpoint provider.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::helpers::assertions::*;
use crate::helpers::factory::RecordingFactory;
use crate::helpers::fixtures::*;

use switchyard_core::debug::{Breakpoint, StepInfo};
use switchyard_core::exchange::Exchange;
use switchyard_memory::MemoryRuntime;
use switchyard_test::TypeMarker;

/// Breakpoint that flips a flag on the first callback.
#[derive(Default)]
struct FlagBreakpoint {
    hit: AtomicBool,
    before: AtomicUsize,
    after: AtomicUsize,
}

impl Breakpoint for FlagBreakpoint {
    fn before_process(&self, _exchange: &Exchange, _step: &StepInfo) {
        self.hit.store(true, Ordering::SeqCst);
        self.before.fetch_add(1, Ordering::SeqCst);
    }

    fn after_process(&self, _exchange: &Exchange, _step: &StepInfo) {
        self.after.fetch_add(1, Ordering::SeqCst);
    }
}

/// One message through a one-step route hits the breakpoint exactly once.
#[tokio::test]
async fn test_e2e_breakpoint_is_hit_once() {
    let factory = RecordingFactory::new(MemoryRuntime::new());
    let breakpoint = Arc::new(FlagBreakpoint::default());
    let provided = Arc::clone(&breakpoint);

    let class = forwarding_class("DebuggerTest")
        .marker(TypeMarker::UseDebugger(true))
        .breakpoint_provider("breakpoint", move |_| {
            Arc::clone(&provided) as Arc<dyn Breakpoint>
        });

    let report = runner(class, &factory)
        .test("sends_one", |t| {
            Box::pin(async move {
                let debugger = t.context()?.debugger();
                anyhow::ensure!(debugger.is_some(), "debugger not installed");
                t.start()?.send_body("Hello World").await?;
                t.out()?.expected_message_count(1);
                t.out()?.assert_is_satisfied(WAIT).await?;
                Ok(())
            })
        })
        .run()
        .await;

    assert_all_passed(&report);
    assert!(breakpoint.hit.load(Ordering::SeqCst));
    assert_eq!(breakpoint.before.load(Ordering::SeqCst), 1);
    assert_eq!(breakpoint.after.load(Ordering::SeqCst), 1);
}

/// Without the marker the provider is validated but never invoked.
#[tokio::test]
async fn test_e2e_breakpoint_provider_ignored_without_debugger() {
    let factory = RecordingFactory::new(MemoryRuntime::new());
    let invoked = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&invoked);

    let class = forwarding_class("NoDebugger").breakpoint_provider("breakpoint", move |_| {
        flag.store(true, Ordering::SeqCst);
        Arc::new(FlagBreakpoint::default()) as Arc<dyn Breakpoint>
    });

    let report = runner(class, &factory)
        .test("no_debugger", |t| {
            Box::pin(async move {
                anyhow::ensure!(t.context()?.debugger().is_none(), "debugger installed");
                Ok(())
            })
        })
        .run()
        .await;

    assert_all_passed(&report);
    assert!(!invoked.load(Ordering::SeqCst));
}
