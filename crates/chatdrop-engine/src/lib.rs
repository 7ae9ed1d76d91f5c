pub mod backend;
pub mod dispatcher;
pub mod dom;
pub mod injector;
pub mod insertion;
pub mod load_watch;
pub mod resolution;
pub mod retry;
pub mod simulated;

pub use chatdrop_common::config;
pub use chatdrop_common::protocol;
