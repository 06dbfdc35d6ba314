//! Carbon Disturbance - disturbance target allocation for forest carbon stands
//!
//! Decides which stands a disturbance event hits and what share of each, so
//! that an area, carbon or proportion target is met as closely as the
//! eligible stands allow.

pub mod core;
pub mod flux;
pub mod inventory;
pub mod simulation;
pub mod targets;
