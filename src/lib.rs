// src/lib.rs

//! starindex: a month-to-page index over a starred-article feed.
//!
//! The remote feed exposes starred articles only through opaque,
//! newest-first pagination. This crate discovers which page each
//! calendar month begins on, persists that mapping, and keeps it
//! self-consistent across repeated, possibly interrupted scans. The
//! read path resolves a month/year filter straight to a page number
//! and refines the index from whatever live fetches reveal.

pub mod config;
pub mod error;
pub mod feed;
pub mod models;
pub mod pipeline;
pub mod store;
