//! Configuration of Kubeflow Pipelines submissions.
//!
//! Provides the typed configuration document with its validating parser, layered loading from
//! YAML files and environment variables, and the per node pool resolution of resources,
//! tolerations, retry policies and extra volumes.

mod environment;
mod load;
pub mod merge;
pub mod resolver;
pub mod shared;

pub use environment::*;
pub use load::*;
