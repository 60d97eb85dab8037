//! Wire models for the Shorlabs dashboard backend

pub mod models;
