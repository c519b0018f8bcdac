// quill/src/lib.rs
//
// Core domain of the client layer: the credit balance state machine, the
// session records it keeps in sync, and the ports the outside world plugs
// into. Nothing in here does I/O directly.

pub mod balance;
pub mod credits;
pub mod domain;
pub mod memory_store;
pub mod ports;
pub mod session;
