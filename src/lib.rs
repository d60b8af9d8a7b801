// Palisade - stateless CSRF protection middleware
//
// Signed, session-bound, time-limited tokens and a request interceptor that
// enforces them in front of any handler built on the palisade-core
// middleware contract.

// Re-export core functionality
pub use palisade_core::*;

// Re-export optional crates
#[cfg(feature = "csrf")]
pub use palisade_csrf;

#[cfg(feature = "config")]
pub use palisade_config;

// Prelude for common imports
pub mod prelude {
    pub use crate::logging::{LogConfig, LogFormat, LogLevel, LogOutput};
    pub use crate::{
        Error, HandlerFn, HttpRequest, HttpResponse, Middleware, MiddlewareChain, Next,
    };

    #[cfg(feature = "csrf")]
    pub use palisade_csrf::{
        CsrfConfig, CsrfError, CsrfMiddleware, ExtractorChain, SameSite, TokenExtractor,
        TokenGenerator,
    };
}
