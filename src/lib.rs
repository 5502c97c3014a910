//! Frame-driven simulation core for a two-world 2D action game: parallel
//! real/ghost playfields, pathfinding enemy AI, a trigger bus, scripted
//! dialogs and a player-centered visibility field. Rendering, physics
//! integration and audio are host capabilities behind the traits in
//! [`ports`].

pub mod constants;
pub mod dialog;
pub mod engine;
pub mod error;
pub mod grid;
pub mod path;
pub mod ports;
pub mod rng;
pub mod triggers;
pub mod types;
pub mod visibility;
pub mod world;

pub use engine::{LevelSimulation, SimOptions};
pub use error::SimError;
