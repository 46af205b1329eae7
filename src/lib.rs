//! Tenq - guided ten-question self-reflection service.
//!
//! A user picks a topic, answers ten AI-generated questions one at a time,
//! and receives a closing summary. Hexagonal layout: `domain` holds the
//! model, `ports` the trait boundaries, `adapters` the SQLite store, the
//! completion-API client, and the HTTP surface, and `application` the engine
//! that ties them together.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
