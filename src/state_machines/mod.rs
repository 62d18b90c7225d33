mod error;
pub mod autotune_fsm;
pub mod fill_fsm;
pub mod safety_fsm;

pub use error::Error as FsmError;
