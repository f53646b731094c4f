//! CNB Carpets admin library.
//!
//! This crate provides the admin API as a library, allowing it to be
//! tested and reused by the CLI.
//!
//! # Security
//!
//! This crate holds privileged credentials:
//! - Identity provider service token (account creation and deletion)
//! - Object storage access for catalog images
//! - SMTP credentials for activation emails

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
