//! # Declarative
//!
//! A framework for declarative lifecycle management of named resource
//! instances.
//!
//! The caller keeps a record of every instance it manages (identity plus the
//! attributes it was last applied with), declares the attributes it wants,
//! and lets the framework converge one to the other through a [`Resource`]
//! handler.
//!
//! ## Core Concepts
//!
//! - **Resource**: A lifecycle handler (create, read, update, delete) with an
//!   attribute [`Schema`]
//! - **ResourceData**: Identity and attributes of one managed instance
//! - **ExecutionPlan**: Per-instance actions computed from prior and desired
//!   state; a changed force-new attribute plans a replacement
//! - **Executor**: Runs the plan on a bounded thread pool
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{ExecuteOptions, ExecutionPlan, TimeoutPolicy, execute_simple};
//!
//! let plan = ExecutionPlan::build(&handler, &prior, &desired)?;
//! let report = execute_simple(&handler, plan, &TimeoutPolicy::default(), &ExecuteOptions::default())?;
//! for outcome in report.outcomes {
//!     match outcome.record {
//!         Some(record) => state.insert(outcome.name, record),
//!         None => state.remove(&outcome.name),
//!     };
//! }
//! ```
//!
//! ## Provider Traits
//!
//! - [`ProgressCallback`]: Receives progress updates
//! - [`ConfirmCallback`]: Handles user confirmations
//!
//! This allows the crate to be used without hard dependencies on
//! specific UI frameworks.

pub mod context;
pub mod diff;
pub mod executor;
pub mod planner;
pub mod resource;
pub mod types;

// Re-export main types at crate root
pub use context::{AutoConfirm, AutoDecline, ConfirmCallback, NoProgress, ProgressCallback};
pub use diff::{AttributeChange, DiffSummary, ResourceDiff};
pub use executor::{ExecuteReport, Outcome, RefreshOutcome, execute, execute_simple, refresh};
pub use planner::{ExecutionPlan, PlannedChange};
pub use resource::{Attribute, Resource, Schema, SchemaError};
pub use types::{
    Action, ApplyResult, Attributes, ExecuteOptions, ExecuteSummary, ResourceData, TimeoutPolicy,
    Timeouts,
};
