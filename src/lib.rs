// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod app_dirs;
pub mod attempt;
pub mod clock;
pub mod config;
pub mod error;
pub mod problem;
pub mod runtime;
pub mod session;
pub mod stats;
pub mod store;
pub mod util;
