//! Catalog objects and the Earth-centered geometry used to place them.

pub mod common;
pub mod sim_object;
