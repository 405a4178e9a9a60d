//! Roomnest - Room listing, review and community backend
//!
//! This library provides the core functionality of the Roomnest service:
//! configuration, the SQLite data layer, business services and the
//! REST API router.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
