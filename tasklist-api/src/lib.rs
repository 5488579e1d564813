//! # Tasklist API Server Library
//!
//! HTTP surface for people, profiles, projects, and tasks, with JWT
//! authentication and an admin role.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod routes;
