//! `cadence-scheduler`: the scheduling engine for one-shot and recurring
//! HTTP-call tasks.
//!
//! # Overview
//!
//! The [`engine::SchedulerEngine`] decides when each task runs and keeps the
//! live registrations in a [`registry::TimerRegistry`] consistent with the
//! persisted tasks. Each firing spawns a [`executor::TaskExecutor`] that
//! performs the outbound call with retries and reports back to the store.
//!
//! # Placement of a task at schedule time
//!
//! | Condition            | Behaviour                                              |
//! |----------------------|--------------------------------------------------------|
//! | `now == start`       | Run now; recurring tasks also get a periodic trigger   |
//! | `now < start`        | Cancellable waiter `schedule_<id>` sleeps until start  |
//! | `now > start`        | Resume: one-shots run now, recurring tasks re-align    |
//!
//! Nothing here is global: every registry lives inside an engine instance.

pub mod alert;
pub mod client;
pub mod clock;
pub mod engine;
pub mod error;
pub mod executor;
pub mod registry;
pub mod schedule;

pub use alert::{AlertError, AlertSender, NoopAlertSender, SlackAlertSender};
pub use client::{CallError, CallResponse, HttpOutboundClient, OutboundClient};
pub use clock::{Clock, SystemClock};
pub use engine::{EngineBuilder, SchedulerEngine};
pub use error::{Result, SchedulerError};
pub use executor::{ExecutionOutcome, RetryPolicy, TaskExecutor};
pub use registry::{PeriodicHandle, PeriodicTrigger, Registration, TimerRegistry, WaiterKey};
