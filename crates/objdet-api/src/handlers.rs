//! Request handlers.

pub mod detector;
pub mod gateway;
