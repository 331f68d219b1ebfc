//! HTTP API handlers for absound-ab

pub mod health;
pub mod matches;
pub mod results;
pub mod session;
pub mod state;

pub use health::health_routes;
pub use matches::{next_match, vote};
pub use results::{get_leaderboard, get_metric, get_sample, get_status, list_samples};
pub use session::{continue_from_complete, next_phase, reset};
pub use state::{export_state, import_state};
