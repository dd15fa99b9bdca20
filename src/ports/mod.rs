//! Port traits: the domain's boundary to the outside world.

pub mod data_port;
