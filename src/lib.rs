//! People application library
//!
//! Person records over a document store: typed CRUD, query chaining, and the
//! walkthrough that exercises them.

pub mod driver;
pub mod modules;

/// Re-export commonly used types
pub use modules::people::{
    NewPerson, Person, PersonId, PersonKey, PersonRepository, PersonSummary, RepoError,
    RepoResult,
};
