//! Axum glue for `banerr`
//!
//! Two pieces of pipeline plumbing:
//! - [`error_boundary`], a middleware that re-renders any error response
//!   leaving the pipeline in the canonical formatter shape
//! - [`validate_request`], the validation hook that short-circuits a request
//!   with a `400` carrying the mapped `invalid-params` data
//!
//! Handlers themselves just return [`banerr::BanResult`]; the `IntoResponse`
//! impl on `BanError` (from the `axum` feature of `banerr`) does the
//! convert -> format -> assemble run with the process-wide defaults.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use banerr::{
    APPLICATION_PROBLEM_JSON, BanError, CanonicalResponse, Opts, bad_request, convert, defaults,
    from_validator_errors,
};
use validator::Validate;

/// Upper bound on error bodies read back for conversion. Anything larger is
/// summarized rather than echoed.
const BODY_LIMIT: usize = 64 * 1024;

/// Middleware that gives every error response the canonical shape.
///
/// Successful responses and responses that are already canonical (stamped
/// with [`CanonicalResponse`], or carrying the active formatter's or the
/// problem-details content type) pass through untouched. Any other 4xx/5xx
/// (an extractor rejection rendered as plain text, a router fallback, a
/// handler bypassing the error model) is routed through [`convert`] and
/// re-rendered, preserving its status.
///
/// Apply with `axum::middleware::from_fn(error_boundary)`.
pub async fn error_boundary(request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    let status = response.status();
    if !status.is_client_error() && !status.is_server_error() {
        return response;
    }
    if is_canonical(&response) {
        return response;
    }

    let (parts, body) = response.into_parts();
    let text = match axum::body::to_bytes(body, BODY_LIMIT).await {
        Ok(bytes) => String::from_utf8_lossy(&bytes).trim().to_owned(),
        Err(err) => {
            tracing::debug!(error = %err, "error body unreadable, rendering status only");
            String::new()
        }
    };

    let opts = Opts::new().status(parts.status.as_u16());
    let err: BanError = if text.is_empty() {
        convert(
            &(),
            opts.message(banerr::reason_phrase(parts.status.as_u16())),
        )
    } else {
        convert(&text, opts)
    };
    err.into_response()
}

fn is_canonical(response: &Response) -> bool {
    // every Rendered response is stamped, whichever formatter shaped it;
    // this keeps per-error formatter overrides intact through the boundary
    if response.extensions().get::<CanonicalResponse>().is_some() {
        return true;
    }
    let active = defaults().formatter.content_type().to_owned();
    response
        .headers()
        .get(http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with(&active) || ct.starts_with(APPLICATION_PROBLEM_JSON))
}

/// Validation hook: check `payload` and short-circuit on failure.
///
/// Returns `Ok(())` when the payload validates; otherwise a `400` error
/// carrying the report mapped to the `invalid-params` shape, ready to be
/// returned from the handler (explicit result instead of control-flow by
/// exception).
///
/// # Errors
///
/// The constructed `400` [`BanError`] when validation fails.
pub fn validate_request<T: Validate>(payload: &T) -> Result<(), BanError> {
    payload.validate().map_err(|report| {
        bad_request(
            Opts::new()
                .message("Validation failed")
                .data(from_validator_errors(&report)),
        )
    })
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[derive(Debug, Validate)]
    struct Signup {
        #[validate(email(message = "Must be valid"))]
        email: String,
    }

    #[test]
    fn validate_request_passes_valid_payloads() {
        let ok = Signup {
            email: "a@b.example".to_owned(),
        };
        assert!(validate_request(&ok).is_ok());
    }

    #[test]
    fn validate_request_short_circuits_with_invalid_params() {
        let bad = Signup {
            email: "nope".to_owned(),
        };
        let err = validate_request(&bad).unwrap_err();
        assert_eq!(err.status().as_u16(), 400);
        assert_eq!(err.message(), "Validation failed");
        let params = err.data().unwrap()["invalid-params"].as_array().unwrap();
        assert_eq!(params.len(), 1);
        assert_eq!(params[0]["name"], "email");
        assert_eq!(params[0]["reason"], "Must be valid");
    }
}
