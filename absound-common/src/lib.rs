//! # absound Common Library
//!
//! Core of the blind A/B/tie listening test for synthetic speech samples:
//! - Sample catalog parsing (filename → synthesis parameters)
//! - Parameter-space distance utilities
//! - Score aggregation over match history
//! - Adaptive tournament engine (explore → refine → showdown)
//! - Persisted state schema, migrations, and key-value storage
//! - Configuration loading

pub mod catalog;
pub mod config;
pub mod distance;
pub mod error;
pub mod migrations;
pub mod scoring;
pub mod storage;
pub mod time;
pub mod tournament;

pub use catalog::{parse_catalog, Sample, SampleId};
pub use error::{Error, Result};
pub use storage::{FileStore, MemoryStore, StateStore};
pub use tournament::{Match, Outcome, Phase, Tournament};
