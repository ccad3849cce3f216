pub mod client;
pub mod compose;
pub mod containers;
pub mod fake;
pub mod runner;

pub use client::RuntimeType;
pub use containers::{ContainerQuery, EngineQuery};
pub use runner::{EngineCommand, IoMode, ProcessOutput, ProcessRunner, SystemRunner};
