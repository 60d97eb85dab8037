//! Watcher application

pub mod commands;
pub mod console;
pub mod options;
pub mod run;
