pub mod aliases;
pub mod cli;
pub mod commands;
pub mod compose;
pub mod context;
pub mod docker;
pub mod error;
pub mod logging;
pub mod model;
pub mod output;
pub mod pki;
pub mod resolver;
pub mod traefik;
