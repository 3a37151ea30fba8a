//! Command line entry points shared by the binaries

pub mod logging;
pub mod server;

pub use logging::init_logging;
pub use server::{ServerArgs, parse_and_bind_address, run_server_mode};
