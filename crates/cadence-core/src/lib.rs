//! `cadence-core`: types, validation and configuration shared by every
//! Cadence crate.

pub mod config;
pub mod error;
pub mod time;
pub mod types;
pub mod validation;

pub use error::{CadenceError, Result, ValidationErrors};
pub use types::{HttpMethod, NewTask, ScheduleKind, Task, TaskData, TaskStatus};
