//! Ports to the external collaborators: storage and message bus

pub mod bus;
pub mod storage;
