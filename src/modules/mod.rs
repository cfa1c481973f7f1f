//! Modules layer - Infrastructure components for external integrations
//!
//! Contains the client for the hosted backend that stores posts, images and
//! pushes change notifications.

pub mod backend;
