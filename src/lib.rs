pub mod arena;
pub mod autopilot;
pub mod benchmark;
pub mod claim;
pub mod client;
pub mod config;
pub mod error;
pub mod runner;
pub mod sampling;
pub mod session;
pub mod supervisor;
pub mod territory;
pub mod tuner;
pub mod util;
pub mod weighting;
pub mod world;
