// src/lib.rs

//! linkwatch: referral-domain watcher with redirect-rule and source-file sinks

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
