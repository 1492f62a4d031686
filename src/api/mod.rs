pub mod error;
pub mod handlers;
pub mod server;
pub mod utils;

pub use error::{ApiError, ApiResult};
pub use server::{build_router, create_app, init_tracing, run_server};
