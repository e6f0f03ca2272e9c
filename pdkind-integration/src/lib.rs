//! Embedding API, command-language parsing/lowering, and configuration
//! (spec.md §6, §7): the frontend that sits between a host application
//! (or `pdkind-repl`) and the pd-kind core (`pdkind-core`, `pdkind-engine`,
//! `pdkind-solve`, `pdkind-term`, `pdkind-ir`).

pub mod config;
pub mod context;
pub mod parser;

pub use config::Options;
pub use context::{delete_context, Context};
