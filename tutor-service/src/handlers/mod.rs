//! HTTP handlers for the tutor service.

pub mod health;
pub mod tutor;
