//! Library exports for the download relay
//!
//! This module exposes internal components for testing and potential library usage.

pub mod config;
pub mod database;
pub mod error;
pub mod handler;
pub mod model;
pub mod registrar;
pub mod relay;
pub mod route;
pub mod validator;
pub mod view;
