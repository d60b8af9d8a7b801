// Core library for Palisade
// Request/response types, the middleware contract and logging setup shared by
// the protection crates.

pub mod cookies;
pub mod error;
pub mod http;
pub mod logging;
pub mod middleware;

pub use cookies::Cookies;
pub use error::{Error, Result};
pub use http::{HttpRequest, HttpResponse};
pub use middleware::{HandlerFn, Middleware, MiddlewareChain, Next};
