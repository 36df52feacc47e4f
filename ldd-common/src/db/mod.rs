//! Database setup shared by LDD services

pub mod init;

pub use init::*;
