//! Dummy-data procedure generation for dummygen.
//!
//! Given a table and its columns, this crate samples representative values
//! (enum labels, check-constraint literals or the most frequent live values)
//! and renders `CREATE PROCEDURE` text that inserts or deletes dummy rows.

pub mod errors;
pub mod literal;
pub mod model;
pub mod procedure;
pub mod sampler;
pub mod type_defaults;

pub use errors::GenerationError;
pub use model::{GenerateOptions, GeneratedProcedurePair, ProcedureNaming};
pub use procedure::{CyclingExpression, DeleteProcedure, ProcedureGenerator, ProcedureNames};
pub use sampler::{allowed_values, parse_in_list, sample_values, ValueCandidate};
pub use type_defaults::TypeDefaults;
