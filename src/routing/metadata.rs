//! Built-in endpoint metadata consumed by the selector policies.

/// HTTP methods an endpoint accepts. An empty list, or `*`, accepts any
/// method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpMethodMetadata {
    methods: Vec<String>,
}

impl HttpMethodMetadata {
    pub fn new<I, S>(methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            methods: methods
                .into_iter()
                .map(|m| m.as_ref().trim().to_ascii_uppercase())
                .collect(),
        }
    }

    #[must_use]
    pub fn methods(&self) -> &[String] {
        &self.methods
    }

    #[must_use]
    pub fn accepts_any(&self) -> bool {
        self.methods.is_empty() || self.methods.iter().any(|m| m == "*")
    }

    #[must_use]
    pub fn allows(&self, method: &str) -> bool {
        self.accepts_any() || self.methods.iter().any(|m| m.eq_ignore_ascii_case(method))
    }
}

/// Host patterns an endpoint accepts: `example.com`, `*.example.com`,
/// either with an optional `:port`, `*` or `*:*` for any host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostMetadata {
    hosts: Vec<String>,
}

impl HostMetadata {
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            hosts: hosts
                .into_iter()
                .map(|h| h.as_ref().trim().to_ascii_lowercase())
                .collect(),
        }
    }

    #[must_use]
    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }
}

/// Request content types an endpoint accepts. `type/*` and `*/*` are
/// wildcards. When `is_optional` is set, a request without a body type is
/// accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptsMetadata {
    content_types: Vec<String>,
    is_optional: bool,
}

impl AcceptsMetadata {
    pub fn new<I, S>(content_types: I, is_optional: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            content_types: content_types
                .into_iter()
                .map(|c| c.as_ref().trim().to_ascii_lowercase())
                .collect(),
            is_optional,
        }
    }

    #[must_use]
    pub fn content_types(&self) -> &[String] {
        &self.content_types
    }

    #[must_use]
    pub const fn is_optional(&self) -> bool {
        self.is_optional
    }
}

/// Marks an endpoint that is never considered by the DFA matcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SuppressMatchingMetadata;
