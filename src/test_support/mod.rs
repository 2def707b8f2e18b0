//! Helpers shared by in-crate unit tests.

pub mod fakes;
#[path = "../../tests/support/socket_guard.rs"]
pub mod socket_guard;
