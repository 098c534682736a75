//! Reference adapters for the storage and bus ports

pub mod bus;
pub mod storage;
