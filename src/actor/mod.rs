//! Actor-based employee workflow processing
//!
//! A Guardian owns one Coordinator, which owns one EmployeeProcessor per
//! employee id with work in flight.

pub mod coordinator;
pub mod guardian;
pub mod message;
pub mod processor;

pub use coordinator::Coordinator;
pub use guardian::Guardian;
pub use message::*;
pub use processor::EmployeeProcessor;
