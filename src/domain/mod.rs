//! Domain model: employees, the approval state machine, bus payloads and errors

pub mod constant;
pub mod employee;
pub mod error;
pub mod event;
pub mod fsm;
