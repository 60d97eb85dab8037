//! Shorwatch Library
//!
//! Observers for a deployment platform: page initialization, status polling
//! and deployment log tailing.

pub mod api;
pub mod app;
pub mod authn;
pub mod errors;
pub mod filesys;
pub mod http;
pub mod logs;
pub mod observe;
pub mod page;
pub mod storage;
pub mod utils;
