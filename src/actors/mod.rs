//! Actors and how they are built.
//!
//! - [`actor`] – the actor, its component table and lifecycle; the session's actor table
//! - [`factory`] – definition tree → actor, through the component registry
//! - [`templates`] – procedural definitions for pickups, projectiles, effects and level objects

pub mod actor;
pub mod factory;
pub mod templates;
