//! Configuration parsing for the workspace settings file and task files

pub mod tasks;
pub mod workspace;
