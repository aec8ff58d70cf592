// src/graph/mod.rs

//! Dependency graph: targets, the files they reach, and the store keeping
//! both sides of that relation consistent.

pub mod dependency;
pub mod store;

pub use dependency::{Dependency, Target};
pub use store::DependencyStore;
