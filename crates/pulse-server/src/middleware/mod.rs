//! Tower middleware applied to every request:
//! - `RequestIdLayer`: genera o propaga X-Request-Id
//! - `LoggingLayer`: span y log por request

mod logging;
mod request_id;

pub use logging::{LoggingLayer, LoggingMiddleware};
pub use request_id::{REQUEST_ID_HEADER, RequestIdLayer, RequestIdMiddleware};
