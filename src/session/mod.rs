pub mod gate;
pub mod state;

pub use gate::{GateOptions, SessionGate};
pub use state::{AuthFailure, SessionState};
