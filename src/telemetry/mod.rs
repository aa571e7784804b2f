pub mod database;
pub mod events;
pub mod http;
pub mod otel;
pub mod subscriber;

pub use events::BusinessEvent;
pub use http::{REQUEST_ID_HEADER, TRACE_ID_HEADER, RequestContext, request_logging_middleware};
pub use subscriber::{init_tracing, shutdown_tracing};
