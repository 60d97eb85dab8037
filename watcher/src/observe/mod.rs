//! Observation of long-running remote operations over plain polling

pub mod handle;
pub mod phase;
pub mod poller;
pub mod registry;
pub mod tailer;
