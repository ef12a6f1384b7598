//! HTTP request handlers.

pub mod health;
pub mod hooks;

pub use health::*;
pub use hooks::*;
