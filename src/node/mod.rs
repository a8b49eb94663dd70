//! Process-level wiring for the two node roles.

pub mod manager;
pub mod wrapper;

pub use manager::{DispatchHandler, ManagerServer};
pub use wrapper::WrapperNode;
