pub mod actor;
pub mod autotune;
pub mod fill_controller;
pub mod pid;
pub mod safety;
pub mod zone;
