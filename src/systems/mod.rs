//! Engine systems.
//!
//! Free functions that run over actors or collaborators rather than inside a
//! single component.
//!
//! Submodules overview
//! - [`audio`] – forward sound requests to the audio thread; headless audio thread
//! - [`render`] – ordered draw list from the scene graph
//! - [`tilemerge`] – continuous-run scan of the main tile plane
//! - [`triggers`] – enter/leave/hit entry points for the physics collaborator

pub mod audio;
pub mod render;
pub mod tilemerge;
pub mod triggers;
