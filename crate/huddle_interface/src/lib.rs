//! Types and collaborator traits shared by the session layer and its backends.

pub mod interface;
pub mod types;
