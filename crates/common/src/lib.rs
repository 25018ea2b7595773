//! Common utilities and types shared across the InTouch backend crates.

#![warn(clippy::pedantic)]

/// Module for JWT utilities (size limits, unverified header/claims parsing)
pub mod jwt;
