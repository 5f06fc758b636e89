pub mod media_backend;
pub mod session_delegate;
