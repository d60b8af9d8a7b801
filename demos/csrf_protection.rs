//! CSRF protection walkthrough
//!
//! Issues a token for a session, then sends a few requests through a
//! middleware chain guarded by `CsrfMiddleware`.
//!
//! ```sh
//! CSRF_SECRET_KEY=change-me-to-something-long-and-random \
//! CSRF_EXEMPT_ROUTES=/api/public/ \
//! PALISADE_LOG_LEVEL=debug PALISADE_LOG_FORMAT=pretty \
//!     cargo run --example csrf_protection
//! ```
//!
//! The same variables can live in a `.env` file. Quote list values that
//! contain spaces there: `CSRF_EXEMPT_ROUTES="/api/public/, /hooks/"`.

use palisade::logging::info;
use palisade::prelude::*;
use std::sync::Arc;

fn form_html(token: &str) -> String {
    format!(
        r#"<form method="POST" action="/transfer">
    <input type="hidden" name="csrf_token" value="{}" />
    <input type="text" name="to" />
    <button type="submit">Send</button>
</form>"#,
        token
    )
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _guard = LogConfig::from_env().init()?;

    let config = CsrfConfig::from_env()?;
    let csrf = CsrfMiddleware::new(config)?;

    // Rendering a form: issue a token bound to the session and set it as a cookie
    let session_id = "demo-session-42";
    let (page, token) = csrf.issue_token(HttpResponse::ok(), session_id)?;
    let page = page.with_body(form_html(&token).into_bytes());
    info!(
        set_cookie = page.header("Set-Cookie").unwrap_or_default(),
        "Rendered form"
    );

    let mut chain = MiddlewareChain::new();
    chain.use_middleware(csrf);

    let handler: HandlerFn = Arc::new(|req: HttpRequest| {
        Box::pin(async move {
            let body = format!("handled {} {}", req.method, req.path);
            Ok(HttpResponse::ok().with_body(body.into_bytes()))
        })
    });

    let cookie = format!("sessionid={}", session_id);
    let requests = vec![
        ("safe method", HttpRequest::new("GET", "/transfer")),
        (
            "header token",
            HttpRequest::new("POST", "/transfer")
                .with_header("Cookie", cookie.clone())
                .with_header("X-CSRF-Token", token.clone()),
        ),
        (
            "form token",
            HttpRequest::new("POST", "/transfer")
                .with_header("Cookie", cookie.clone())
                .with_header("Content-Type", "application/x-www-form-urlencoded")
                .with_body(format!("to=bob&csrf_token={}", token)),
        ),
        (
            "no session",
            HttpRequest::new("POST", "/transfer").with_header("X-CSRF-Token", token.clone()),
        ),
        (
            "forged",
            HttpRequest::new("POST", "/transfer").with_header("Cookie", cookie.clone()),
        ),
        ("exempt route", HttpRequest::new("POST", "/api/public/ping")),
    ];

    for (label, req) in requests {
        let response = chain.apply(req, handler.clone()).await?;
        println!(
            "{:<14} -> {} {}",
            label,
            response.status,
            String::from_utf8_lossy(&response.body)
        );
    }

    Ok(())
}
