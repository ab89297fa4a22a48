#![allow(dead_code)] // Each integration test binary uses a different subset

pub mod configurators;
pub mod strategies;

pub use configurators::*;
pub use strategies::*;
