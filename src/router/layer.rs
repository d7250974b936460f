//! Native callback types and the per-layer path matcher.

use std::collections::HashMap;
use std::sync::Arc;

use matchit::Router as MatchitRouter;
use percent_encoding::percent_decode_str;

use crate::error::Error;
use crate::method::Method;
use crate::next::Next;
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;

/// A native middleware: `(req, res, next)`.
pub type Callback = Arc<dyn Fn(Request, Response, Next) + Send + Sync + 'static>;

/// A native error middleware: `(err, req, res, next)`. Only invoked while an
/// error is pending.
pub type ErrorCallback = Arc<dyn Fn(Error, Request, Response, Next) + Send + Sync + 'static>;

/// A native parameter callback: `(req, res, next, value)`.
pub type ParamCallback = Arc<dyn Fn(Request, Response, Next, String) + Send + Sync + 'static>;

/// Anything the router can put on its stack.
#[derive(Clone)]
pub enum Layer {
    Callback(Callback),
    ErrorCallback(ErrorCallback),
    /// A mounted sub-router. The prefix it is mounted on is stripped from
    /// [`Request::path`] while it runs.
    Router(Router),
}

impl Layer {
    pub fn callback(f: impl Fn(Request, Response, Next) + Send + Sync + 'static) -> Self {
        Self::Callback(Arc::new(f))
    }

    pub fn error_callback(f: impl Fn(Error, Request, Response, Next) + Send + Sync + 'static) -> Self {
        Self::ErrorCallback(Arc::new(f))
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Self::Callback(_) => "callback",
            Self::ErrorCallback(_) => "error callback",
            Self::Router(_) => "router",
        }
    }
}

impl From<Router> for Layer {
    fn from(router: Router) -> Self {
        Self::Router(router)
    }
}

/// A layer together with the requests it applies to.
pub(crate) struct Entry {
    pub(crate) matcher: Matcher,
    pub(crate) layer: Layer,
}

pub(crate) enum Matcher {
    /// `verb`/`all` registrations: full-path match, `None` accepts any method.
    Route { method: Option<Method>, tree: MatchitRouter<()> },
    /// `use` registrations: segment-aligned prefix match. Stored without a
    /// trailing slash, so `""` mounts at the root.
    Prefix(String),
}

/// Result of a successful match.
pub(crate) struct Matched {
    /// Route parameters in path order.
    pub(crate) params: Vec<(String, String)>,
    /// Remaining path below a prefix match.
    pub(crate) rest: Option<String>,
}

impl Matcher {
    /// # Panics
    ///
    /// Panics if `path` is not a valid route pattern.
    pub(crate) fn route(method: Option<Method>, path: &str) -> Self {
        let mut tree = MatchitRouter::new();
        tree.insert(translate(path), ())
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        Self::Route { method, tree }
    }

    pub(crate) fn prefix(path: &str) -> Self {
        Self::Prefix(path.trim_end_matches('/').to_owned())
    }

    pub(crate) fn matches(&self, method: Method, path: &str) -> Option<Matched> {
        match self {
            Self::Route { method: wanted, tree } => {
                // `HEAD` falls back to `GET` routes.
                if wanted.is_some_and(|m| m != method && !(m == Method::Get && method == Method::Head)) {
                    return None;
                }
                // Non-strict routing: `/users/` matches `/users`.
                let matched = tree.at(path).ok().or_else(|| {
                    let trimmed = path.strip_suffix('/').filter(|p| !p.is_empty())?;
                    tree.at(trimmed).ok()
                })?;
                let params = matched.params.iter()
                    .map(|(k, v)| (k.to_owned(), decode(v)))
                    .collect();
                Some(Matched { params, rest: None })
            }
            Self::Prefix(prefix) => {
                let rest = path.strip_prefix(prefix.as_str())?;
                let rest = match rest {
                    "" => "/",
                    r if r.starts_with('/') => r,
                    _ => return None,
                };
                Some(Matched { params: Vec::new(), rest: Some(rest.to_owned()) })
            }
        }
    }
}

impl Matched {
    /// The request as the matched layer sees it.
    pub(crate) fn view(&self, req: &Request) -> Request {
        match &self.rest {
            Some(rest) => req.with_path(rest),
            None => req.with_params(self.param_map()),
        }
    }

    pub(crate) fn param_map(&self) -> HashMap<String, String> {
        self.params.iter().cloned().collect()
    }
}

/// Percent-decodes a parameter value. Values that do not decode to UTF-8
/// are kept as received.
fn decode(value: &str) -> String {
    match percent_decode_str(value).decode_utf8() {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => value.to_owned(),
    }
}

/// Translates Express-style `:name` segments into matchit's `{name}`.
fn translate(path: &str) -> String {
    path.split('/')
        .map(|segment| match segment.strip_prefix(':') {
            Some(name) => format!("{{{name}}}"),
            None => segment.to_owned(),
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn express_parameters_are_translated() {
        assert_eq!(translate("/users/:id/posts/:post"), "/users/{id}/posts/{post}");
        assert_eq!(translate("/"), "/");
        assert_eq!(translate("/static/{id}"), "/static/{id}");
    }

    #[test]
    fn route_matchers_filter_on_method_and_extract_params() {
        let matcher = Matcher::route(Some(Method::Get), "/:user");
        let matched = matcher.matches(Method::Get, "/42").unwrap();
        assert_eq!(matched.params, vec![("user".to_owned(), "42".to_owned())]);
        assert!(matcher.matches(Method::Post, "/42").is_none());
        assert!(matcher.matches(Method::Get, "/42/more").is_none());

        let any = Matcher::route(None, "/users");
        assert!(any.matches(Method::Delete, "/users/").is_some());
    }

    #[test]
    fn head_requests_fall_back_to_get_routes() {
        let get = Matcher::route(Some(Method::Get), "/u/:id");
        assert!(get.matches(Method::Head, "/u/1").is_some());

        let head = Matcher::route(Some(Method::Head), "/u/:id");
        assert!(head.matches(Method::Get, "/u/1").is_none());
    }

    #[test]
    fn parameters_are_percent_decoded() {
        let matcher = Matcher::route(None, "/u/:name");
        let matched = matcher.matches(Method::Get, "/u/a%20b").unwrap();
        assert_eq!(matched.params, vec![("name".to_owned(), "a b".to_owned())]);

        // Not UTF-8 once decoded: kept as received.
        let matched = matcher.matches(Method::Get, "/u/%FF").unwrap();
        assert_eq!(matched.params, vec![("name".to_owned(), "%FF".to_owned())]);
    }

    #[test]
    fn prefix_matchers_respect_segment_boundaries() {
        let matcher = Matcher::prefix("/api/");
        assert_eq!(matcher.matches(Method::Get, "/api").unwrap().rest.as_deref(), Some("/"));
        assert_eq!(matcher.matches(Method::Get, "/api/users").unwrap().rest.as_deref(), Some("/users"));
        assert!(matcher.matches(Method::Get, "/apiary").is_none());

        let root = Matcher::prefix("/");
        assert_eq!(root.matches(Method::Put, "/x/y").unwrap().rest.as_deref(), Some("/x/y"));
    }
}
