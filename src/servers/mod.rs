// Public API - what other modules can use
pub use pool::{ServerPool, ServerStatus};
pub use probe::{ProbeReport, ServerProbe, StaticServerProbe, TcpServerProbe};

// Internal modules
mod pool;
mod probe;
