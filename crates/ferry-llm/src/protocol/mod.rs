//! Vendor-specific wire format types
//!
//! `OpenAI` needs no module here: its wire format is the canonical one in
//! [`crate::types`].

pub mod anthropic;
pub mod google;
pub mod workers_ai;
