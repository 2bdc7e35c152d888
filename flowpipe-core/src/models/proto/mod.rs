//! Generated flowpipe wire model.

mod flowpipe;

pub use flowpipe::*;
