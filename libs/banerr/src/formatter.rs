//! The pluggable formatter protocol and the built-in JSON formatter

use http::HeaderMap;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::error::BanError;
use crate::sanitize::scrub;
use crate::status::reason_phrase;

/// Content type emitted by [`DefaultFormatter`].
pub const APPLICATION_JSON: &str = "application/json";

/// Failure raised by a formatter on internal invariant violation.
///
/// Formatting is the only fallible stage of the pipeline: conversion always
/// succeeds and assembly never fails. These errors propagate to the caller
/// of the dispatch adapter, they are never swallowed here.
#[derive(Debug, Error)]
pub enum FormatError {
    /// A validation-detail entry is structurally unusable.
    #[error("invalid validation param: {reason}")]
    InvalidParam { reason: String },
    /// The assembled problem document violates its own shape rules.
    #[error("assembled problem document is invalid: {reason}")]
    InvalidProblem { reason: String },
}

/// Per-call formatting inputs, resolved by the precedence rules before the
/// formatter runs.
pub struct FormatContext<'a> {
    /// Transport headers accompanying the response. Visible to formatters
    /// but never serialized into the body.
    pub headers: &'a HeaderMap,
    /// Effective sanitize list (middleware-level and error-level keys,
    /// concatenated).
    pub sanitize: &'a [String],
    /// Effective stack-trace policy.
    pub include_stack_trace: bool,
}

/// A formatter turns a [`BanError`] into a transport payload.
///
/// Implementations are peers, not a hierarchy: the whole contract is the
/// declared content type plus a pure `format` function. Any configuration
/// (such as a base URL) is fixed at construction; implementations must not
/// mutate per call.
pub trait ErrorFormatter: Send + Sync {
    /// Content type declared for the produced payload.
    fn content_type(&self) -> &str;

    /// Produce the wire payload for `error`.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError`] when the assembled payload violates the
    /// formatter's own shape rules.
    fn format(&self, error: &BanError, ctx: &FormatContext<'_>) -> Result<Value, FormatError>;
}

/// The built-in `application/json` formatter.
///
/// Payload shape: `{statusCode, error, message, data?, stack?, causeStack?}`.
/// Stack fields appear only when the stack-trace policy asks for them or the
/// error is flagged as a developer error; developer errors always carry their
/// stack so that whatever reads the payload next (typically a log sink) gets
/// full detail. The network-facing safety boundary is the production
/// redaction applied at assembly time, not this flag.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultFormatter;

impl ErrorFormatter for DefaultFormatter {
    fn content_type(&self) -> &str {
        APPLICATION_JSON
    }

    fn format(&self, error: &BanError, ctx: &FormatContext<'_>) -> Result<Value, FormatError> {
        let status = error.status().as_u16();
        let mut body = Map::new();
        body.insert("statusCode".to_owned(), Value::from(status));
        body.insert("error".to_owned(), Value::from(reason_phrase(status)));
        body.insert("message".to_owned(), Value::from(error.message()));
        if let Some(data) = error.data() {
            body.insert("data".to_owned(), data.clone());
        }
        if ctx.include_stack_trace || error.is_developer_error() {
            if let Some(stack) = error.stack() {
                body.insert("stack".to_owned(), Value::from(stack));
            }
            if let Some(chain) = error.cause_chain() {
                body.insert("causeStack".to_owned(), Value::from(chain));
            }
        }
        // the whole payload is scrubbed, not just `data`
        Ok(scrub(Value::Object(body), ctx.sanitize))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::error::{IS_DEVELOPER_ERROR, Opts, convert_err};
    use serde_json::json;

    fn ctx<'a>(headers: &'a HeaderMap, sanitize: &'a [String]) -> FormatContext<'a> {
        FormatContext {
            headers,
            sanitize,
            include_stack_trace: false,
        }
    }

    #[test]
    fn payload_has_status_error_and_message() {
        let err = BanError::from_opts(Opts::new().status(404).message("User not found"));
        let headers = HeaderMap::new();
        let body = DefaultFormatter
            .format(&err, &ctx(&headers, &[]))
            .expect("format");
        assert_eq!(
            body,
            json!({ "statusCode": 404, "error": "Not Found", "message": "User not found" })
        );
    }

    #[test]
    fn data_is_included_when_present() {
        let err = BanError::from_opts(
            Opts::new()
                .status(409)
                .message("dup")
                .data(json!({ "id": 7 })),
        );
        let headers = HeaderMap::new();
        let body = DefaultFormatter
            .format(&err, &ctx(&headers, &[]))
            .expect("format");
        assert_eq!(body["data"], json!({ "id": 7 }));
    }

    #[test]
    fn transport_headers_never_leak_into_body() {
        let err = BanError::new(400);
        let mut headers = HeaderMap::new();
        headers.insert("x-foo", "1".parse().expect("header"));
        let body = DefaultFormatter
            .format(&err, &ctx(&headers, &[]))
            .expect("format");
        let obj = body.as_object().expect("object");
        assert!(!obj.contains_key("x-foo"));
        assert!(!obj.contains_key("X-Foo"));
        assert!(!obj.contains_key("headers"));
    }

    #[test]
    fn stack_omitted_by_default() {
        let err = BanError::new(500);
        let headers = HeaderMap::new();
        let body = DefaultFormatter
            .format(&err, &ctx(&headers, &[]))
            .expect("format");
        assert!(body.get("stack").is_none());
        assert!(body.get("causeStack").is_none());
    }

    #[test]
    fn cause_stack_surfaces_when_requested() {
        let err = convert_err(
            std::io::Error::other("disk io"),
            Opts::new().status(503),
        );
        let headers = HeaderMap::new();
        let context = FormatContext {
            headers: &headers,
            sanitize: &[],
            include_stack_trace: true,
        };
        let body = DefaultFormatter.format(&err, &context).expect("format");
        assert_eq!(body["causeStack"], json!("disk io"));
    }

    #[test]
    fn developer_error_surfaces_stack_regardless_of_flag() {
        let err = convert_err(
            std::io::Error::other("oops"),
            Opts::new().data(json!({ IS_DEVELOPER_ERROR: true })),
        );
        let headers = HeaderMap::new();
        let body = DefaultFormatter
            .format(&err, &ctx(&headers, &[]))
            .expect("format");
        assert_eq!(body["causeStack"], json!("oops"));
    }

    #[test]
    fn sanitize_applies_to_whole_payload() {
        let err = BanError::from_opts(
            Opts::new()
                .status(400)
                .data(json!({ "user": { "password": "x", "profile": { "token": "y" } } })),
        );
        let headers = HeaderMap::new();
        let keys = vec!["password".to_owned(), "token".to_owned()];
        let body = DefaultFormatter
            .format(&err, &ctx(&headers, &keys))
            .expect("format");
        assert_eq!(body["data"], json!({ "user": { "profile": {} } }));
    }
}
