//! Process lifecycle helpers

mod shutdown;

pub use shutdown::{watch_stdin, ShutdownSignal, StopHandle};
