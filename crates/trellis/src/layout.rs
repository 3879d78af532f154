//! Layout pipeline for workflow graphs.
//!
//! # Pipeline Position
//!
//! ```text
//! GraphSnapshot
//!     ↓ structure
//! ProblemHierarchy
//!     ↓ layout (this module)
//! HierarchyLayout
//!     ↓ viewport
//! LayoutOutput
//! ```
//!
//! # Submodules
//!
//! - [`placement`] - Solved node positions and feedback edges
//! - [`ports`] - Port ordinals of branching nodes
//! - [`positioning`] - Normalisation and anchoring of solved layouts
//! - [`viewport`] - Anchor selection and viewport reconciliation
//!
//! # Re-exports
//!
//! - [`EngineBuilder`] - Runs a placement engine over a problem hierarchy
//! - [`PlacementEngine`] - Interface of a single-problem solver
//! - [`LayeredEngine`] - The layered placement engine

mod engines;
pub mod placement;
pub mod ports;
pub mod positioning;
pub mod viewport;

pub use engines::{EngineBuilder, HierarchyLayout, LayeredEngine, PlacementEngine};
