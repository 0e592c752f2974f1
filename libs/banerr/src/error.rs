//! The canonical error representation (`BanError`) and its conversions

use std::any::Any;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use http::{HeaderMap, StatusCode};
use serde_json::Value;

use crate::formatter::ErrorFormatter;
use crate::status::{normalize_status, reason_phrase};

/// Reserved `data` key flagging a sensitive internal error.
///
/// Errors carrying `{"isDeveloperError": true}` always surface their stack in
/// formatter output, and are redacted at response-assembly time in production.
pub const IS_DEVELOPER_ERROR: &str = "isDeveloperError";

/// Canonical HTTP-layer error.
///
/// Status is always within 400-599 (anything else normalizes to 500 at
/// construction), the message defaults to the registered reason phrase, and
/// `headers`/`allow`/`sanitize` are owned copies of the caller's input.
/// Status, message and data are fixed after construction; a new value is
/// produced via [`convert`] when fields need to change.
#[derive(Clone)]
#[must_use]
pub struct BanError {
    status: StatusCode,
    message: String,
    data: Option<Value>,
    headers: HeaderMap,
    allow: Option<Vec<String>>,
    cause: Option<Arc<dyn StdError + Send + Sync>>,
    cause_chain: Option<String>,
    stack: Option<String>,
    formatter: Option<Arc<dyn ErrorFormatter>>,
    sanitize: Vec<String>,
    include_stack_trace: Option<bool>,
}

/// Construction options for [`BanError`].
///
/// Every field is optional; `From<&str>` / `From<String>` build a
/// message-only `Opts`, so the named constructors accept either a bare
/// message or a full options value.
#[derive(Default)]
#[must_use]
pub struct Opts {
    pub status: Option<u16>,
    pub message: Option<String>,
    pub data: Option<Value>,
    pub headers: Option<HeaderMap>,
    pub allow: Option<Vec<String>>,
    pub cause: Option<Arc<dyn StdError + Send + Sync>>,
    pub formatter: Option<Arc<dyn ErrorFormatter>>,
    pub sanitize: Option<Vec<String>>,
    pub include_stack_trace: Option<bool>,
}

impl Opts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = Some(headers);
        self
    }

    pub fn allow<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allow = Some(methods.into_iter().map(Into::into).collect());
        self
    }

    pub fn cause(mut self, cause: impl StdError + Send + Sync + 'static) -> Self {
        self.cause = Some(Arc::new(cause));
        self
    }

    pub fn formatter(mut self, formatter: Arc<dyn ErrorFormatter>) -> Self {
        self.formatter = Some(formatter);
        self
    }

    pub fn sanitize<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sanitize = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    pub fn include_stack_trace(mut self, include: bool) -> Self {
        self.include_stack_trace = Some(include);
        self
    }
}

impl From<&str> for Opts {
    fn from(message: &str) -> Self {
        Opts::new().message(message)
    }
}

impl From<String> for Opts {
    fn from(message: String) -> Self {
        Opts::new().message(message)
    }
}

impl From<()> for Opts {
    fn from((): ()) -> Self {
        Opts::new()
    }
}

impl BanError {
    /// Build an error from options. The public construction entry point:
    /// the stack trace (when backtraces are enabled) is captured here, so
    /// user-facing stacks point at the construction site rather than at
    /// library internals.
    pub fn from_opts(opts: Opts) -> Self {
        let status = normalize_status(opts.status.unwrap_or(500));
        let message = opts
            .message
            .unwrap_or_else(|| reason_phrase(status.as_u16()).to_owned());
        let cause_chain = opts.cause.as_deref().map(render_chain);
        Self {
            status,
            message,
            data: opts.data,
            headers: opts.headers.unwrap_or_default(),
            allow: opts.allow,
            cause: opts.cause,
            cause_chain,
            stack: capture_stack(),
            formatter: opts.formatter,
            sanitize: opts.sanitize.unwrap_or_default(),
            include_stack_trace: opts.include_stack_trace,
        }
    }

    /// Shorthand for an error with only a status; message defaults to the
    /// reason phrase.
    pub fn new(status: u16) -> Self {
        Self::from_opts(Opts::new().status(status))
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[must_use]
    pub fn allow(&self) -> Option<&[String]> {
        self.allow.as_deref()
    }

    #[must_use]
    pub fn cause(&self) -> Option<&(dyn StdError + Send + Sync)> {
        self.cause.as_deref()
    }

    /// Rendered source chain of the wrapped cause, if any.
    #[must_use]
    pub fn cause_chain(&self) -> Option<&str> {
        self.cause_chain.as_deref()
    }

    #[must_use]
    pub fn stack(&self) -> Option<&str> {
        self.stack.as_deref()
    }

    #[must_use]
    pub fn formatter(&self) -> Option<&Arc<dyn ErrorFormatter>> {
        self.formatter.as_ref()
    }

    #[must_use]
    pub fn sanitize_keys(&self) -> &[String] {
        &self.sanitize
    }

    #[must_use]
    pub fn include_stack_trace(&self) -> Option<bool> {
        self.include_stack_trace
    }

    /// Instance-level formatter selection; the only post-construction setter.
    pub fn set_formatter(&mut self, formatter: Arc<dyn ErrorFormatter>) {
        self.formatter = Some(formatter);
    }

    /// True when `data` carries `isDeveloperError: true` (exactly the boolean
    /// `true`, not merely a truthy value).
    #[must_use]
    pub fn is_developer_error(&self) -> bool {
        self.data
            .as_ref()
            .and_then(|d| d.get(IS_DEVELOPER_ERROR))
            .is_some_and(|flag| flag == &Value::Bool(true))
    }

    fn merge(&self, opts: Opts) -> Self {
        let status = opts
            .status
            .map_or(self.status, normalize_status);
        let mut headers = self.headers.clone();
        if let Some(overrides) = opts.headers {
            for (name, value) in &overrides {
                headers.insert(name.clone(), value.clone());
            }
        }
        let cause = opts.cause.or_else(|| self.cause.clone());
        let cause_chain = cause.as_deref().map(render_chain);
        Self {
            status,
            message: opts.message.unwrap_or_else(|| self.message.clone()),
            data: opts.data.or_else(|| self.data.clone()),
            headers,
            allow: opts.allow.or_else(|| self.allow.clone()),
            cause,
            cause_chain,
            // the original capture is authoritative, never regenerated
            stack: self.stack.clone(),
            formatter: opts.formatter.or_else(|| self.formatter.clone()),
            sanitize: opts.sanitize.unwrap_or_else(|| self.sanitize.clone()),
            include_stack_trace: opts.include_stack_trace.or(self.include_stack_trace),
        }
    }
}

impl fmt::Display for BanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

impl fmt::Debug for BanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BanError")
            .field("status", &self.status)
            .field("message", &self.message)
            .field("data", &self.data)
            .field("headers", &self.headers)
            .field("allow", &self.allow)
            .field("cause", &self.cause_chain)
            .field("has_formatter", &self.formatter.is_some())
            .field("sanitize", &self.sanitize)
            .field("include_stack_trace", &self.include_stack_trace)
            .finish_non_exhaustive()
    }
}

impl StdError for BanError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause
            .as_ref()
            .map(|c| &**c as &(dyn StdError + 'static))
    }
}

/// Structural identity check over heterogeneous error values.
///
/// True iff `value` is a [`BanError`] and, when `status` is given, its status
/// matches exactly. Never panics, false for anything else.
#[must_use]
pub fn is_ban_error(value: &dyn Any, status: Option<u16>) -> bool {
    value
        .downcast_ref::<BanError>()
        .is_some_and(|err| status.is_none_or(|s| err.status.as_u16() == s))
}

/// Normalize an arbitrary thrown value into a [`BanError`]. Total: always
/// produces a valid error, never fails.
///
/// Already-canonical values are merged with `opts` field by field (explicit
/// options win; headers shallow-merge with the override winning per key;
/// an `allow` override replaces the list entirely; the original stack is
/// always preserved). Error-like values (`anyhow::Error`, boxed
/// `dyn Error`) supply the message and their rendered source chain;
/// string-like values become the message; anything else falls back to
/// `"Unknown error"`. In the
/// non-canonical branches the status defaults to `opts.status` or 500.
pub fn convert(value: &dyn Any, mut opts: Opts) -> BanError {
    if let Some(existing) = value.downcast_ref::<BanError>() {
        return existing.merge(opts);
    }
    if let Some(err) = value.downcast_ref::<anyhow::Error>() {
        let message = opts.message.take().unwrap_or_else(|| err.to_string());
        let chain = err
            .chain()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n    caused by: ");
        let mut out = BanError::from_opts(Opts { message: Some(message), ..opts });
        out.cause_chain = Some(chain);
        return out;
    }
    if let Some(err) = value.downcast_ref::<Box<dyn StdError + Send + Sync>>() {
        let message = opts.message.take().unwrap_or_else(|| err.to_string());
        let mut out = BanError::from_opts(Opts { message: Some(message), ..opts });
        out.cause_chain = Some(render_chain(&**err));
        return out;
    }
    if let Some(err) = value.downcast_ref::<Box<dyn StdError>>() {
        let message = opts.message.take().unwrap_or_else(|| err.to_string());
        let mut out = BanError::from_opts(Opts { message: Some(message), ..opts });
        out.cause_chain = Some(render_chain(&**err));
        return out;
    }
    let message = if let Some(text) = value.downcast_ref::<String>() {
        opts.message.take().unwrap_or_else(|| text.clone())
    } else if let Some(text) = value.downcast_ref::<&str>() {
        opts.message.take().unwrap_or_else(|| (*text).to_owned())
    } else {
        opts.message.take().unwrap_or_else(|| "Unknown error".to_owned())
    };
    BanError::from_opts(Opts { message: Some(message), ..opts })
}

/// Typed entry point of [`convert`] for real error values: the error becomes
/// the `cause` (with its source chain captured) and supplies the message
/// unless `opts` overrides it.
pub fn convert_err<E>(err: E, mut opts: Opts) -> BanError
where
    E: StdError + Send + Sync + 'static,
{
    let message = opts.message.take().unwrap_or_else(|| err.to_string());
    BanError::from_opts(Opts {
        message: Some(message),
        cause: Some(Arc::new(err)),
        ..opts
    })
}

fn capture_stack() -> Option<String> {
    let backtrace = Backtrace::capture();
    match backtrace.status() {
        BacktraceStatus::Captured => Some(backtrace.to_string()),
        _ => None,
    }
}

fn render_chain<E: StdError + ?Sized>(err: &E) -> String {
    let mut out = err.to_string();
    let mut current: Option<&(dyn StdError + 'static)> = err.source();
    while let Some(source) = current {
        out.push_str("\n    caused by: ");
        out.push_str(&source.to_string());
        current = source.source();
    }
    out
}
