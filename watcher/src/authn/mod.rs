//! Authentication

pub mod credential;
pub mod provider;
