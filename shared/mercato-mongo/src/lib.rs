//! Mercato Mongo
//!
//! Document-store connectivity and a generic identity-keyed repository over
//! one entity collection. Store-specific query construction stays behind the
//! [`Repository`] trait; callers hand over `bson::Document` filters and the
//! store evaluates them.

mod error;
mod memory;
mod mongo;
mod repository;
mod store;

pub use error::RepositoryError;
pub use memory::InMemoryRepository;
pub use mongo::MongoRepository;
pub use repository::Repository;
pub use store::MongoStore;

pub use mongodb::bson;
