// src/lib.rs

//! Client library for the Fandom wiki platform.
//!
//! Connect to a community, read its recent changes and discussion posts,
//! or register observers on an [`monitor::ActivityMonitor`] to be notified
//! of new activity as it happens.

pub mod error;
pub mod models;
pub mod monitor;
pub mod services;
pub mod storage;
pub mod utils;
