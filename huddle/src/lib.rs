//! Client for the group management API: login flow, group screen and profile
//! editing, driven through presentation collaborators.

pub mod alerts;
pub mod config;
pub mod context;
pub mod lifecycle;
pub mod pages;
#[cfg(test)]
mod testing;
