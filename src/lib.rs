//! Peg Leg engine library.
//!
//! This module exposes the engine's actors, components, resources, systems,
//! and events for use in integration tests and as a reusable library.

pub mod actors;
pub mod components;
pub mod error;
pub mod events;
pub mod game;
pub mod geometry;
pub mod resources;
pub mod systems;
