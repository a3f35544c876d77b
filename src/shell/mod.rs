//! The interactive shell: state machine, session orchestration and the web UI.

pub mod page;
pub mod server;
pub mod session;
pub mod state;

pub use server::{router, serve};
pub use session::Session;
pub use state::{ShellEvent, ShellState};
