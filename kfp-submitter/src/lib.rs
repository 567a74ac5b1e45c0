//! Turns a validated configuration document into a pipeline run request and submits it.

pub mod config;
pub mod core;
pub mod credentials;
pub mod submitter;
pub mod tasks;
