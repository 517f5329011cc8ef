use std::time::{Instant, SystemTime};
use url::Url;
use uuid::Uuid;

/// Header used to propagate a correlation id between services.
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

/// URL as exposed by a [`LogContext`].
///
/// A parsed URL is decomposed into host, path and query fields; a raw one
/// is logged as a single opaque string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextUrl<'a> {
    Raw(&'a str),
    Parsed(&'a Url),
}

/// Capabilities the logging facade needs from a per-request context.
///
/// Only the correlation id and the start time are mandatory; every other
/// getter defaults to `None` and the matching fields are then left out of
/// the record.
pub trait LogContext {
    fn correlation_id(&self) -> &str;

    /// Monotonic start of the unit of work; `duration` is measured from here.
    ///
    /// An `Instant` cannot cross a process boundary. A context whose start
    /// was propagated as wall-clock time should report it through
    /// [`started_at`](LogContext::started_at) instead and may return
    /// `Instant::now()` here.
    fn start_time(&self) -> Instant;

    /// Wall-clock start, preferred over [`start_time`](LogContext::start_time)
    /// when present. A start in the future yields a zero duration.
    fn started_at(&self) -> Option<SystemTime> {
        None
    }

    fn source(&self) -> Option<&str> {
        None
    }

    fn method(&self) -> Option<&str> {
        None
    }

    fn url(&self) -> Option<ContextUrl<'_>> {
        None
    }

    fn user_id(&self) -> Option<&str> {
        None
    }

    fn ip_address(&self) -> Option<&str> {
        None
    }
}

impl<C: LogContext + ?Sized> LogContext for &C {
    fn correlation_id(&self) -> &str {
        (**self).correlation_id()
    }

    fn start_time(&self) -> Instant {
        (**self).start_time()
    }

    fn started_at(&self) -> Option<SystemTime> {
        (**self).started_at()
    }

    fn source(&self) -> Option<&str> {
        (**self).source()
    }

    fn method(&self) -> Option<&str> {
        (**self).method()
    }

    fn url(&self) -> Option<ContextUrl<'_>> {
        (**self).url()
    }

    fn user_id(&self) -> Option<&str> {
        (**self).user_id()
    }

    fn ip_address(&self) -> Option<&str> {
        (**self).ip_address()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum RequestUrl {
    Raw(String),
    Parsed(Url),
}

impl RequestUrl {
    fn from_input(input: &str) -> Self {
        match Url::parse(input) {
            Ok(url) => RequestUrl::Parsed(url),
            Err(_) => RequestUrl::Raw(input.to_string()),
        }
    }
}

/// Context for one unit of work (inbound request, outbound call,
/// background job).
///
/// The correlation id and start time are fixed at construction and there
/// are no setters; use [`RequestContext::builder`] to fill optional data.
#[derive(Debug, Clone)]
pub struct RequestContext {
    correlation_id: String,
    source: Option<String>,
    method: Option<String>,
    url: Option<RequestUrl>,
    start: Instant,
    user_id: Option<String>,
    ip_address: Option<String>,
}

impl RequestContext {
    /// Fresh context with a generated correlation id.
    pub fn new() -> Self {
        RequestContextBuilder::default().build()
    }

    /// Context continuing a unit of work started elsewhere, keeping the
    /// caller's correlation id.
    pub fn linked(source: &str, method: &str, url: &str, correlation_id: &str) -> Self {
        RequestContextBuilder::default()
            .correlation_id(correlation_id)
            .source(source)
            .method(method)
            .url(url)
            .build()
    }

    pub fn builder() -> RequestContextBuilder {
        RequestContextBuilder::default()
    }

    /// Builder seeded with the correlation id found in `headers`, if any.
    /// Header names are matched case-insensitively.
    pub fn from_headers<'a, I>(headers: I) -> RequestContextBuilder
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut builder = RequestContextBuilder::default();
        if let Some((_, value)) = headers
            .into_iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(CORRELATION_ID_HEADER))
        {
            builder = builder.correlation_id(value.trim());
        }
        builder
    }

    /// Headers to attach to an outbound call so the callee can link its
    /// records to this context.
    pub fn propagation_headers(&self) -> [(&'static str, &str); 1] {
        [(CORRELATION_ID_HEADER, self.correlation_id.as_str())]
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl LogContext for RequestContext {
    fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    fn start_time(&self) -> Instant {
        self.start
    }

    fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    fn url(&self) -> Option<ContextUrl<'_>> {
        self.url.as_ref().map(|url| match url {
            RequestUrl::Raw(raw) => ContextUrl::Raw(raw),
            RequestUrl::Parsed(parsed) => ContextUrl::Parsed(parsed),
        })
    }

    fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    fn ip_address(&self) -> Option<&str> {
        self.ip_address.as_deref()
    }
}

/// Collects optional data for a [`RequestContext`]. The start time is taken
/// when [`build`](RequestContextBuilder::build) is called.
#[derive(Debug, Clone, Default)]
pub struct RequestContextBuilder {
    correlation_id: Option<String>,
    source: Option<String>,
    method: Option<String>,
    url: Option<RequestUrl>,
    user_id: Option<String>,
    ip_address: Option<String>,
}

impl RequestContextBuilder {
    /// Use an existing correlation id. An empty id is ignored and a new one
    /// is generated at build time.
    pub fn correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = non_empty(id.into());
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = non_empty(source.into());
        self
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = non_empty(method.into());
        self
    }

    /// Absolute URLs are parsed so they can be logged as host/path/query;
    /// anything else is kept verbatim.
    pub fn url(mut self, url: &str) -> Self {
        self.url = if url.is_empty() {
            None
        } else {
            Some(RequestUrl::from_input(url))
        };
        self
    }

    pub fn parsed_url(mut self, url: Url) -> Self {
        self.url = Some(RequestUrl::Parsed(url));
        self
    }

    pub fn user_id(mut self, id: impl Into<String>) -> Self {
        self.user_id = non_empty(id.into());
        self
    }

    pub fn ip_address(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = non_empty(ip.into());
        self
    }

    pub fn build(self) -> RequestContext {
        RequestContext {
            correlation_id: self
                .correlation_id
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            source: self.source,
            method: self.method,
            url: self.url,
            start: Instant::now(),
            user_id: self.user_id,
            ip_address: self.ip_address,
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_generates_distinct_uuid_ids() {
        let a = RequestContext::new();
        let b = RequestContext::new();
        assert_ne!(a.correlation_id(), b.correlation_id());
        assert!(Uuid::parse_str(a.correlation_id()).is_ok());
        assert!(a.source().is_none());
        assert!(a.url().is_none());
    }

    #[test]
    fn linked_keeps_the_given_id() {
        let ctx = RequestContext::linked("billing", "POST", "/charge", "cid-42");
        assert_eq!(ctx.correlation_id(), "cid-42");
        assert_eq!(ctx.source(), Some("billing"));
        assert_eq!(ctx.method(), Some("POST"));
        assert_eq!(ctx.url(), Some(ContextUrl::Raw("/charge")));
    }

    #[test]
    fn empty_correlation_id_is_replaced() {
        let ctx = RequestContext::linked("", "", "", "");
        assert!(!ctx.correlation_id().is_empty());
        assert!(ctx.source().is_none());
        assert!(ctx.method().is_none());
        assert!(ctx.url().is_none());
    }

    #[test]
    fn absolute_urls_are_parsed() {
        let ctx = RequestContext::builder()
            .url("https://api.example.com/v1/users?page=2")
            .build();
        match ctx.url() {
            Some(ContextUrl::Parsed(url)) => {
                assert_eq!(url.host_str(), Some("api.example.com"));
                assert_eq!(url.path(), "/v1/users");
                assert_eq!(url.query(), Some("page=2"));
            }
            other => panic!("expected parsed url, got {other:?}"),
        }
    }

    #[test]
    fn correlation_id_is_read_from_headers() {
        let headers = [("Content-Type", "application/json"), ("X-Correlation-ID", " abc ")];
        let ctx = RequestContext::from_headers(headers).source("gateway").build();
        assert_eq!(ctx.correlation_id(), "abc");
        assert_eq!(ctx.propagation_headers(), [(CORRELATION_ID_HEADER, "abc")]);

        let fresh = RequestContext::from_headers([("accept", "*/*")]).build();
        assert!(!fresh.correlation_id().is_empty());
    }

    #[test]
    fn start_time_is_fixed_at_build() {
        let ctx = RequestContext::new();
        let clone = ctx.clone();
        assert_eq!(ctx.start_time(), clone.start_time());
        assert!(ctx.start_time() <= Instant::now());
    }
}
