//! Route classification.
//!
//! Paths are classified after the `/api` mount prefix is stripped, so the
//! tables below hold `/login`, not `/api/login`.

use std::fmt;

/// Paths reachable without any credential. Matched exactly.
pub const PUBLIC_PATHS: [&str; 4] = ["/login", "/findmail", "/signup", "/nifty"];

/// Pre-production bypass prefixes for trading and portfolio data.
/// Only honoured when the gateway is built with the bypass enabled.
pub const DEVELOPMENT_OPEN_PREFIXES: [&str; 2] = ["/stock/", "/portfolio"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    Public,
    DevelopmentOpen,
    Protected,
}

impl RouteClass {
    #[must_use]
    pub const fn requires_token(self) -> bool {
        matches!(self, Self::Protected)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::DevelopmentOpen => "development_open",
            Self::Protected => "protected",
        }
    }
}

impl fmt::Display for RouteClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed route tables plus the bypass switch, built once at startup.
#[derive(Debug, Clone)]
pub struct RouteTable {
    public: Vec<String>,
    development_open: Vec<String>,
    development_open_enabled: bool,
}

impl RouteTable {
    #[must_use]
    pub fn new(development_open_enabled: bool) -> Self {
        Self {
            public: PUBLIC_PATHS.iter().map(ToString::to_string).collect(),
            development_open: DEVELOPMENT_OPEN_PREFIXES
                .iter()
                .map(ToString::to_string)
                .collect(),
            development_open_enabled,
        }
    }

    #[must_use]
    pub const fn development_open_enabled(&self) -> bool {
        self.development_open_enabled
    }

    /// Classify a request path. Pure; nothing is cached between calls.
    #[must_use]
    pub fn classify(&self, path: &str) -> RouteClass {
        if self.public.iter().any(|public| public == path) {
            return RouteClass::Public;
        }

        if self.development_open_enabled
            && self
                .development_open
                .iter()
                .any(|prefix| path.starts_with(prefix.as_str()))
        {
            return RouteClass::DevelopmentOpen;
        }

        RouteClass::Protected
    }
}
