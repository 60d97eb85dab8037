//! Backend HTTP access

pub mod client;
pub mod deployments;
pub mod github;
pub mod projects;
