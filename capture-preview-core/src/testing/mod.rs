//! Test doubles shared by the unit tests.

pub mod fake_backend;

pub use fake_backend::{FakeBackend, FakeScript, Journal};
