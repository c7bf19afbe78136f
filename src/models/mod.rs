//! Core data models for the image store.
//!
//! `object` maps to the `objects` table via `sqlx::FromRow`; `request` holds
//! the JSON bodies the HTTP layer decodes.

pub mod object;
pub mod request;
