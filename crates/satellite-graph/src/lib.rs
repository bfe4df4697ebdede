//! Relationship derivation for the Satellite graph.
//!
//! Turns an entity snapshot into a [`Graph`] of nodes and typed
//! relationships. Derivation is table driven: every kind has one
//! [`KindRule`] describing its properties and which relationships it
//! originates.
//!
//! # Modules
//!
//! - [`rules`] -- The per-kind rule table and property extraction
//! - [`index`] -- Namespace-scoped label index for selector matching
//! - [`builder`] -- [`GraphBuilder`], the pure snapshot-to-graph function
//!
//! [`Graph`]: satellite_types::Graph

pub mod builder;
pub mod index;
pub mod rules;

// Re-export primary types at crate root.
pub use builder::GraphBuilder;
pub use index::LabelIndex;
pub use rules::{KindRule, Properties, RULES};
