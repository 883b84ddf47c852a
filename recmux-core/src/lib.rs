//! # recmux core
//!
//! Sample types and pipeline element plumbing shared by the recmux crates.
//! Elements consume [`Sample`]s and forward them to attached children
//! through a fan-out [`Node`].

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod element;
pub mod error;
pub mod sample;

// Re-export main types
pub use element::{Element, Node};
pub use error::{CoreError, CoreResult};
pub use sample::{Sample, SampleKind, SamplePayload};
