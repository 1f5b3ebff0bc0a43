//! Port traits at the I/O seams.

pub mod config_port;
pub mod series_port;
