//! Pool API Server
//!
//! REST surface over the funding-pool ledger.
//!
//! ## Endpoints
//!
//! ### Pools
//! - POST /pools - Create pool
//! - GET  /pools?status= - List pools
//! - GET  /pools/:pool_id - Get pool snapshot
//! - POST /pools/:pool_id/activate - Open for investment
//! - POST /pools/:pool_id/cancel - Cancel (refused once funds committed)
//! - POST /pools/maturity/sweep - Run maturity sweep
//!
//! ### Investments
//! - POST /pools/:pool_id/investments - Invest
//! - GET  /investments/:investment_id - Get record (rejected included)
//! - POST /investments/:investment_id/redeem - Redeem at maturity
//! - GET  /investors/:investor/investments - List by investor
//!
//! ### Achievements
//! - POST /investors/:investor/connect - Session connect (welcome grant)
//! - GET  /investors/:investor/achievements - Tier and milestones
//!
//! ### Misc
//! - GET /health, GET /ready, GET /stats
//!
//! Errors are `{ "error", "code" }` JSON bodies; capacity rejections add a
//! `remaining` field with the exact investable remainder.

pub mod dto;
pub mod error;
pub mod routes;
pub mod server;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use server::{create_server, run_server, start_background_server};
pub use state::{ApiConfig, AppState};
