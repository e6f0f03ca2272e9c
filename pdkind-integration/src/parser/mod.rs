//! The command-language front end of spec.md §6.2: a minimal s-expression
//! reader (`sexpr`), a formula lowering shared by both surface dialects
//! (`term`), the native state-machine dialect (`mcmt`), and constrained
//! Horn clauses (`chc`, spec.md §8 scenario S5).

pub mod chc;
pub mod mcmt;
pub mod sexpr;
pub mod term;
