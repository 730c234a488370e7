//! Rendement - investment platform earnings engine
//!
//! Accrual, referral-commission, and level-progression core for a
//! deposit-based investment platform. The engine is invoked on a fixed
//! cadence by an external scheduler and talks to the rest of the world
//! through the `interfaces` traits.

pub mod config;
pub mod domain;
pub mod interfaces;
pub mod notify;
pub mod services;
pub mod storage;
pub mod utils;
