//! Port traits for the external collaborators.

pub mod config_port;
pub mod data_port;
pub mod report_port;
