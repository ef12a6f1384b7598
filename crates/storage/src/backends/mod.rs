//! Object store backends.

pub mod s3;
