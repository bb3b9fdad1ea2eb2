//! Routine timeline core for Hatchling.
//!
//! Turns routines and caregiver updates fetched from the backend into a
//! sorted day timeline with a status per entry, and keeps that timeline
//! fresh with a cancellable poll loop.

pub mod client;
pub mod clock;
pub mod config;
pub mod fetch;
pub mod models;
pub mod poll;
pub mod render;
pub mod timeline;
