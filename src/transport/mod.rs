//! Transports feeding raw messages into the dispatcher
//!
//! Both transports handle each inbound message on its own task and funnel
//! replies through a single writer per stream or connection.

pub mod stdio;
pub mod ws;
