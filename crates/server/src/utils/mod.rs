mod request;
pub use request::{RequestScope, recommend_error};

mod shutdown_signal;
pub use shutdown_signal::shutdown_signal;

mod state;
pub use state::{AppState, Service};
