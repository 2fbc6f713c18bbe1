#![allow(unused_crate_dependencies)]

pub mod cli;
pub mod config;
pub mod environment;
pub mod error;
pub mod launch;
pub mod logging;
pub mod runtime;
