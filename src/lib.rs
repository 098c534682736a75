//! # Employee Workflow
//!
//! An event-driven approval workflow for employees.
//!
//! This crate provides functionality to:
//! - Accept employee creations and lifecycle triggers from a message bus
//! - Evaluate triggers against a fixed state machine, one employee at a time
//! - Persist accepted transitions and publish every outcome
//! - Stream outcomes to subscribers filtered by employee

pub mod actor;
pub mod adapter;
pub mod cli;
pub mod config;
pub mod context;
pub mod domain;
pub mod port;
pub mod service;
pub mod ui;

pub use config::AppConfig;
pub use context::AppContext;
pub use domain::{
    employee::{Employee, EmployeeDraft, EmployeeId, EmployeeState},
    error::WorkflowError,
    event::TransitionOutcome,
    fsm::{Decision, Trigger}
};
