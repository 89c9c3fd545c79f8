//! Orchestrator lifecycle state machine.
//!
//! ```text
//! Unstarted ──scan──▶ Initialized ──setup──▶ Active
//!                          ▲                   │
//!                          └─────teardown──────┘
//! (any) ──final_teardown──▶ TornDown
//! ```

use std::fmt;

use serde::Serialize;

/// Where an orchestrator is in its class run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LifecycleState {
    /// Nothing scanned yet.
    Unstarted,
    /// Configuration scanned, no test method in flight.
    Initialized,
    /// A test method is running between setup and teardown.
    Active,
    /// Class-scope teardown finished. Terminal.
    TornDown,
}

impl LifecycleState {
    pub fn after_scan(self) -> Option<Self> {
        match self {
            Self::Unstarted => Some(Self::Initialized),
            _ => None,
        }
    }

    pub fn after_setup(self) -> Option<Self> {
        match self {
            Self::Initialized => Some(Self::Active),
            _ => None,
        }
    }

    pub fn after_teardown(self) -> Option<Self> {
        match self {
            Self::Active => Some(Self::Initialized),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::TornDown)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unstarted => write!(f, "unstarted"),
            Self::Initialized => write!(f, "initialized"),
            Self::Active => write!(f, "active"),
            Self::TornDown => write!(f, "torn_down"),
        }
    }
}

/// How contexts are scoped for a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleMode {
    /// A fresh context per test method.
    PerTest,
    /// One context per class and worker, reset between methods.
    PerClass,
}

impl LifecycleMode {
    /// Metric label value.
    pub fn label(self) -> &'static str {
        match self {
            Self::PerTest => "per_test",
            Self::PerClass => "per_class",
        }
    }
}

impl fmt::Display for LifecycleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
