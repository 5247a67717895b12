//! Background Tasks Module
//!
//! Contains the tasks that run alongside the HTTP server.
//!
//! # Tasks
//! - Change listener: applies queued Exchange change events to the cache

mod listener;

pub use listener::spawn_change_listener;
