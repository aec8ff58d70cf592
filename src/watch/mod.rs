// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Classifying raw `notify` events into created/changed/removed (`event`).
//! - Keeping one watch per dependency path in step with the graph
//!   (`manager`), through a swappable [`WatchBackend`].
//! - Matching and discovering target files under the project root
//!   (`targets`).
//! - (Optionally) content hashing to drop notifications that did not change
//!   a file's bytes (`hash`, `cache`).
//!
//! It does **not** decide what to re-run; it only turns filesystem changes
//! into bus events and runtime events.

pub mod backend;
pub mod cache;
pub mod event;
pub mod hash;
pub mod manager;
pub mod path_utils;
pub mod targets;

pub use backend::{NotifyWatchBackend, WatchBackend, WatchHandle};
pub use event::{FsEvent, FsEventKind};
pub use manager::WatchManager;
pub use targets::{TargetMatcher, TargetWatcherHandle, spawn_target_watcher};
