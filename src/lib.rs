//! Assigns display outputs to CRTCs and applies the result through Mutter.

pub mod allocator;
pub mod backend;
pub mod cli;
pub mod configure;
pub mod listing;
pub mod plan;
pub mod request;
pub mod topology;
