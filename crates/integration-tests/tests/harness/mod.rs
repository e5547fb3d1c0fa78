//! Shared fixtures; each test binary uses a subset
#![allow(dead_code)]

pub mod config;
pub mod mock_vendor;
pub mod server;
