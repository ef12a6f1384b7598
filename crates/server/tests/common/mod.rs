//! Common test utilities and fixtures.

pub mod logs;
pub mod registry;
pub mod server;

#[allow(unused_imports)]
pub use logs::*;
#[allow(unused_imports)]
pub use registry::*;
#[allow(unused_imports)]
pub use server::*;
