pub mod discovery;
pub mod parser;
pub mod project;

pub use project::Project;
