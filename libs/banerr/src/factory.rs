//! Named convenience constructors, one per standard 4xx/5xx status
//!
//! Each accepts either a bare message or a full [`Opts`] value and fixes the
//! status to its code:
//!
//! ```
//! use banerr::{not_found, method_not_allowed, Opts};
//!
//! let simple = not_found("User not found");
//! let detailed = method_not_allowed(Opts::new().message("nope").allow(["GET", "POST"]));
//! assert_eq!(simple.status().as_u16(), 404);
//! assert_eq!(detailed.status().as_u16(), 405);
//! ```

use serde_json::{Map, Value, json};

use crate::error::{BanError, IS_DEVELOPER_ERROR, Opts};

macro_rules! status_constructors {
    ($($(#[$doc:meta])* $name:ident => $code:literal,)+) => {
        $(
            $(#[$doc])*
            pub fn $name(opts: impl Into<Opts>) -> BanError {
                let mut opts = opts.into();
                opts.status = Some($code);
                BanError::from_opts(opts)
            }
        )+
    };
}

status_constructors! {
    /// 400 Bad Request
    bad_request => 400,
    /// 401 Unauthorized
    unauthorized => 401,
    /// 402 Payment Required
    payment_required => 402,
    /// 403 Forbidden
    forbidden => 403,
    /// 404 Not Found
    not_found => 404,
    /// 405 Method Not Allowed
    method_not_allowed => 405,
    /// 406 Not Acceptable
    not_acceptable => 406,
    /// 407 Proxy Authentication Required
    proxy_auth_required => 407,
    /// 408 Request Timeout
    request_timeout => 408,
    /// 409 Conflict
    conflict => 409,
    /// 410 Gone
    gone => 410,
    /// 411 Length Required
    length_required => 411,
    /// 412 Precondition Failed
    precondition_failed => 412,
    /// 413 Payload Too Large
    payload_too_large => 413,
    /// 414 URI Too Long
    uri_too_long => 414,
    /// 415 Unsupported Media Type
    unsupported_media_type => 415,
    /// 416 Range Not Satisfiable
    range_not_satisfiable => 416,
    /// 417 Expectation Failed
    expectation_failed => 417,
    /// 418 I'm a teapot
    teapot => 418,
    /// 421 Misdirected Request
    misdirected_request => 421,
    /// 422 Unprocessable Entity
    unprocessable_entity => 422,
    /// 423 Locked
    locked => 423,
    /// 424 Failed Dependency
    failed_dependency => 424,
    /// 425 Too Early
    too_early => 425,
    /// 426 Upgrade Required
    upgrade_required => 426,
    /// 428 Precondition Required
    precondition_required => 428,
    /// 429 Too Many Requests
    too_many_requests => 429,
    /// 431 Request Header Fields Too Large
    request_header_fields_too_large => 431,
    /// 451 Unavailable For Legal Reasons
    unavailable_for_legal_reasons => 451,
    /// 500 Internal Server Error
    internal_server_error => 500,
    /// 501 Not Implemented
    not_implemented => 501,
    /// 502 Bad Gateway
    bad_gateway => 502,
    /// 503 Service Unavailable
    service_unavailable => 503,
    /// 504 Gateway Timeout
    gateway_timeout => 504,
    /// 505 HTTP Version Not Supported
    http_version_not_supported => 505,
    /// 506 Variant Also Negotiates
    variant_also_negotiates => 506,
    /// 507 Insufficient Storage
    insufficient_storage => 507,
    /// 508 Loop Detected
    loop_detected => 508,
    /// 510 Not Extended
    not_extended => 510,
    /// 511 Network Authentication Required
    network_authentication_required => 511,
}

/// 500 flagged as an internal implementation fault.
///
/// `data.isDeveloperError` is forced to `true` no matter what the caller
/// supplies; every other caller `data` key is kept (caller wins on
/// collisions). Non-object caller data is preserved under a `value` key so
/// the flag can still be carried.
pub fn bad_implementation(opts: impl Into<Opts>) -> BanError {
    let mut opts = opts.into();
    opts.status = Some(500);
    let mut data = match opts.data.take() {
        None => Map::new(),
        Some(Value::Object(map)) => map,
        Some(other) => {
            let mut map = Map::new();
            map.insert("value".to_owned(), other);
            map
        }
    };
    data.insert(IS_DEVELOPER_ERROR.to_owned(), json!(true));
    opts.data = Some(Value::Object(data));
    BanError::from_opts(opts)
}
