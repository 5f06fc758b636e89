//! Session orchestration on a dedicated worker thread.

mod manager;
mod pending;
mod request;
mod worker;

pub use manager::SessionManager;
pub use pending::Pending;
pub use request::StartRequest;
