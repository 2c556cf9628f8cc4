//! # Bridge Engine
//!
//! Ties the matcher to a [`MediaBackend`](crate::video::MediaBackend): open two
//! videos, find the smoothest splice point and write the spliced result.

pub mod engine;

pub use engine::{BridgeEngine, BridgeOutcome, MatchSummary};
