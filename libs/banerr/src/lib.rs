//! Canonical HTTP-layer errors for request/response pipelines
//!
//! This crate standardizes how errors are represented, enriched and rendered
//! into wire responses. It provides:
//! - the canonical error value ([`BanError`]) with total conversion from
//!   arbitrary thrown values ([`convert`])
//! - the pluggable formatter protocol ([`ErrorFormatter`]) with built-in
//!   JSON ([`DefaultFormatter`]) and RFC 7807 ([`Rfc7807Formatter`])
//!   formatters
//! - recursive key scrubbing of payloads ([`scrub`])
//! - response assembly with production redaction of developer errors
//!   ([`render`], [`assemble`])
//!
//! The `axum` feature makes [`BanError`] and [`Rendered`] usable directly as
//! responses; the `validator` feature maps validation reports to the
//! `invalid-params` problem extension.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod defaults;
pub mod error;
pub mod factory;
pub mod formatter;
pub mod problem;
pub mod render;
pub mod sanitize;
pub mod status;

// Re-export commonly used types
pub use defaults::{Defaults, Mode, defaults, set_defaults};
pub use error::{BanError, IS_DEVELOPER_ERROR, Opts, convert, convert_err, is_ban_error};
pub use factory::{
    bad_gateway, bad_implementation, bad_request, conflict, expectation_failed,
    failed_dependency, forbidden, gateway_timeout, gone, http_version_not_supported,
    insufficient_storage, internal_server_error, length_required, locked, loop_detected,
    method_not_allowed, misdirected_request, network_authentication_required, not_acceptable,
    not_extended, not_found, not_implemented, payload_too_large, payment_required,
    precondition_failed, precondition_required, proxy_auth_required, range_not_satisfiable,
    request_header_fields_too_large, request_timeout, service_unavailable, teapot, too_early,
    too_many_requests, unauthorized, unavailable_for_legal_reasons, unprocessable_entity,
    unsupported_media_type, upgrade_required, uri_too_long, variant_also_negotiates,
};
pub use formatter::{
    APPLICATION_JSON, DefaultFormatter, ErrorFormatter, FormatContext, FormatError,
};
pub use problem::{
    APPLICATION_PROBLEM_JSON, InvalidParam, Problem, Rfc7807Formatter, Violation,
    constraint_violation, validation_error,
};
#[cfg(feature = "validator")]
pub use problem::from_validator_errors;
pub use render::{REDACTED_MESSAGE, Rendered, assemble, render};
#[cfg(feature = "axum")]
pub use render::CanonicalResponse;
pub use sanitize::scrub;
pub use status::{UNKNOWN_ERROR, normalize_status, reason_phrase};

/// Standard result type for request handlers backed by [`BanError`].
///
/// With the `axum` feature, `BanError` implements `IntoResponse`, so the `?`
/// operator plus this alias is all a handler needs for uniform error
/// rendering.
pub type BanResult<T = ()> = Result<T, BanError>;
