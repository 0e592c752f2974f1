//! Process-wide rendering defaults

use std::sync::{Arc, LazyLock};

use arc_swap::ArcSwap;
use http::HeaderMap;

use crate::formatter::{DefaultFormatter, ErrorFormatter};

/// Runtime mode consulted by the developer-error redaction rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    Production,
    #[default]
    Development,
}

impl Mode {
    /// Read the conventional environment flag: `APP_ENV=production` (or
    /// `NODE_ENV=production` for parity with common deployments) selects
    /// production, anything else is development.
    #[must_use]
    pub fn from_env() -> Self {
        let is_prod = |var: &str| {
            std::env::var(var).is_ok_and(|v| v.eq_ignore_ascii_case("production"))
        };
        if is_prod("APP_ENV") || is_prod("NODE_ENV") {
            Mode::Production
        } else {
            Mode::Development
        }
    }

    #[must_use]
    pub fn is_production(self) -> bool {
        self == Mode::Production
    }
}

/// Middleware-level rendering defaults.
///
/// Per-error overrides win over these; sanitize lists are concatenated
/// rather than replaced, headers are merged with the error-level entry
/// winning per key.
#[derive(Clone)]
pub struct Defaults {
    pub formatter: Arc<dyn ErrorFormatter>,
    pub headers: HeaderMap,
    pub sanitize: Vec<String>,
    pub include_stack_trace: bool,
    pub mode: Mode,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            formatter: Arc::new(DefaultFormatter),
            headers: HeaderMap::new(),
            sanitize: Vec::new(),
            include_stack_trace: false,
            mode: Mode::default(),
        }
    }
}

impl Defaults {
    /// Defaults with the mode taken from the environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            mode: Mode::from_env(),
            ..Self::default()
        }
    }
}

static DEFAULTS: LazyLock<ArcSwap<Defaults>> =
    LazyLock::new(|| ArcSwap::from_pointee(Defaults::from_env()));

/// Current process-wide defaults.
///
/// Readers always observe a complete value; the cell is swapped atomically.
#[must_use]
pub fn defaults() -> Arc<Defaults> {
    DEFAULTS.load_full()
}

/// Replace the process-wide defaults. Intended to be called once at startup,
/// before requests are served.
pub fn set_defaults(value: Defaults) {
    DEFAULTS.store(Arc::new(value));
}
