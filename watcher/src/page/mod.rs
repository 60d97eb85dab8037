//! Page initialization

pub mod fsm;
pub mod init;
