//! drugpredict-web: HTTP service around the analysis pipeline.
//!
//! Built on Axum. Submissions run on a bounded worker pool; clients poll
//! `/api/progress/{task_id}` or subscribe to `/api/events` (SSE) for stage
//! updates. Generated charts are served from `/outputs`.

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod sse;
pub mod state;
pub mod tasks;
pub mod worker;

pub use error::ApiError;
pub use router::build_router;
pub use server::serve;
pub use state::{AppEvent, AppState, SharedState};
