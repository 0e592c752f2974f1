//! Response assembly and the formatter-selection precedence rules

use http::header::{ALLOW, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, StatusCode};
use serde_json::{Value, json};

use crate::defaults::{Defaults, Mode};
use crate::error::BanError;
use crate::formatter::{ErrorFormatter, FormatContext, FormatError};
use crate::status::reason_phrase;

/// Body used when a developer error is redacted in production.
pub const REDACTED_MESSAGE: &str = "An internal server error occurred";

/// A transport-ready response: status, headers and a JSON body.
#[derive(Debug, Clone)]
#[must_use]
pub struct Rendered {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

/// Wrap a formatted payload into a transport response.
///
/// Headers start from `Content-Type: {content_type}`, then `base_headers`
/// (middleware-level), then the error's own headers, later entries winning
/// per key. A non-empty `allow` list is joined into the `Allow` header.
///
/// Developer errors (`data.isDeveloperError == true`) in production mode
/// have their body replaced wholesale with a minimal generic payload; the
/// suppressed detail is logged first. Client errors and unflagged server
/// errors are never redacted. Never fails.
pub fn assemble(
    error: &BanError,
    payload: Value,
    content_type: &str,
    base_headers: &HeaderMap,
    mode: Mode,
) -> Rendered {
    let status = error.status();
    let mut headers = HeaderMap::new();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_str(content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/json")),
    );
    for (name, value) in base_headers {
        headers.insert(name.clone(), value.clone());
    }
    for (name, value) in error.headers() {
        headers.insert(name.clone(), value.clone());
    }
    if let Some(allow) = error.allow() {
        if !allow.is_empty() {
            if let Ok(value) = HeaderValue::from_str(&allow.join(", ")) {
                headers.insert(ALLOW, value);
            }
        }
    }

    let body = if error.is_developer_error() && mode.is_production() {
        tracing::error!(
            status = status.as_u16(),
            message = %error.message(),
            cause = error.cause_chain().unwrap_or_default(),
            "developer error redacted from response"
        );
        json!({
            "statusCode": status.as_u16(),
            "error": reason_phrase(status.as_u16()),
            "message": REDACTED_MESSAGE,
        })
    } else {
        payload
    };

    Rendered {
        status,
        headers,
        body,
    }
}

/// Run an error through format + assemble with full precedence resolution.
///
/// Per-error values win over `defaults` for formatter and stack-trace
/// policy; sanitize lists are concatenated (both applied); headers are
/// merged with the error level winning. The same resolution applies whether
/// the error was built directly or synthesized by [`crate::convert`].
///
/// # Errors
///
/// Propagates the formatter's [`FormatError`]; the core never catches its
/// own formatter's failures.
pub fn render(error: &BanError, defaults: &Defaults) -> Result<Rendered, FormatError> {
    let formatter: &dyn ErrorFormatter = error
        .formatter()
        .map_or(defaults.formatter.as_ref(), AsRef::as_ref);
    let include_stack_trace = error
        .include_stack_trace()
        .unwrap_or(defaults.include_stack_trace);
    let sanitize: Vec<String> = defaults
        .sanitize
        .iter()
        .chain(error.sanitize_keys())
        .cloned()
        .collect();
    // formatters see the effective header set, error-level winning per key
    let mut effective_headers = defaults.headers.clone();
    for (name, value) in error.headers() {
        effective_headers.insert(name.clone(), value.clone());
    }
    let ctx = FormatContext {
        headers: &effective_headers,
        sanitize: &sanitize,
        include_stack_trace,
    };
    let payload = formatter.format(error, &ctx)?;
    Ok(assemble(
        error,
        payload,
        formatter.content_type(),
        &defaults.headers,
        defaults.mode,
    ))
}

#[cfg(feature = "axum")]
pub use axum_impl::CanonicalResponse;

/// Axum integration: rendered responses and raw errors convert directly.
#[cfg(feature = "axum")]
mod axum_impl {
    use axum::response::{IntoResponse, Response};

    use super::{Rendered, render};
    use crate::defaults::defaults;
    use crate::error::BanError;
    use crate::status::reason_phrase;
    use serde_json::json;

    /// Response-extension marker stamped on every response produced from a
    /// [`Rendered`], regardless of which formatter shaped the body. Error
    /// boundaries use it to pass already-canonical responses through
    /// untouched instead of guessing from the content type.
    #[derive(Debug, Clone, Copy)]
    pub struct CanonicalResponse;

    impl IntoResponse for Rendered {
        fn into_response(self) -> Response {
            let mut resp = axum::Json(self.body).into_response();
            *resp.status_mut() = self.status;
            for (name, value) in &self.headers {
                resp.headers_mut().insert(name.clone(), value.clone());
            }
            resp.extensions_mut().insert(CanonicalResponse);
            resp
        }
    }

    impl IntoResponse for BanError {
        fn into_response(self) -> Response {
            match render(&self, &defaults()) {
                Ok(rendered) => rendered.into_response(),
                Err(err) => {
                    // formatter failure: hosting pipeline's generic safety net
                    tracing::error!(error = %err, "formatter failed, emitting generic 500");
                    Rendered {
                        status: http::StatusCode::INTERNAL_SERVER_ERROR,
                        headers: http::HeaderMap::new(),
                        body: json!({
                            "statusCode": 500,
                            "error": reason_phrase(500),
                            "message": super::REDACTED_MESSAGE,
                        }),
                    }
                    .into_response()
                }
            }
        }
    }
}
