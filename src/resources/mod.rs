//! Long-lived data and collaborators shared by components and systems.
//!
//! Overview
//! - `audio` – bridge and channel to the background audio thread
//! - `definition` – the definition tree actors are built from and emitted to
//! - `gameconfig` – INI-backed engine configuration
//! - `imagestore` – per-component image cache keyed by canonical frame name
//! - `loader` – resource-loader collaborator (directory listing, decoded assets)
//! - `palette` – 256-colour palette for fill tiles
//! - `scenegraph` – render nodes announced by render components
//! - `worldtime` – frame clock and lag-spike guard
pub mod audio;
pub mod definition;
pub mod gameconfig;
pub mod imagestore;
pub mod loader;
pub mod palette;
pub mod scenegraph;
pub mod worldtime;
