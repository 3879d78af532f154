//! Trellis Core Types
//!
//! This crate provides the foundational types shared by the Trellis layout
//! engine and the editors that call it:
//!
//! - **Identifiers**: Efficient string-interned identifiers ([`identifier::Id`])
//! - **Geometry**: Basic geometric types ([`geometry`] module)
//! - **Graph**: The editor snapshot model handed to the engine ([`graph`] module)

pub mod geometry;
pub mod graph;
pub mod identifier;
