//! Application services between the bus and callers

pub mod employee;
pub mod gateway;
pub mod intake;
pub mod publisher;

pub use employee::EmployeeService;
pub use gateway::{StatusGateway, StatusSubscription};
pub use publisher::OutcomePublisher;
