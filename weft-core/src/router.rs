// Method-keyed route table over matchit
//
// Routes are registered with httprouter-style placeholders (`:name` for one
// segment, `*name` for a trailing catch-all) and translated to the matchit
// syntax at registration time.

use crate::app::ViewState;
use crate::handler::HandlerFn;
use http::Method;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// A registered route: the terminal handler plus the view that owns it.
///
/// Dispatch reads middleware and the error handler from the owning view at
/// request time, so view configuration changes apply to routes registered
/// earlier.
pub(crate) struct RouteEntry {
    pub(crate) handler: HandlerFn,
    pub(crate) view: Arc<ViewState>,
}

/// Path parameters captured by a route match.
#[derive(Debug, Clone, Default)]
pub struct RouteParams {
    params: Vec<(String, String)>,
}

impl RouteParams {
    pub(crate) fn from_match(params: &matchit::Params<'_, '_>) -> Self {
        Self {
            params: params
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
        }
    }

    /// Value of the named parameter, if the route captured it.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }
}

/// Shared route table, one matchit router per HTTP method.
#[derive(Default)]
pub(crate) struct Mux {
    routes: RwLock<HashMap<Method, matchit::Router<Arc<RouteEntry>>>>,
}

impl Mux {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register a handler for `method` at `path`.
    ///
    /// Panics when the pattern is invalid or conflicts with an existing
    /// route; misregistration is a programming error and surfaces at
    /// startup.
    pub(crate) fn register(&self, method: Method, path: &str, entry: RouteEntry) {
        let pattern = translate_pattern(path);
        let mut routes = self.routes.write().unwrap();
        let router = routes.entry(method.clone()).or_default();
        if let Err(err) = router.insert(pattern, Arc::new(entry)) {
            panic!("invalid route {method} {path}: {err}");
        }
    }

    /// Match `path` against the routes registered for `method`.
    pub(crate) fn lookup(
        &self,
        method: &Method,
        path: &str,
    ) -> Option<(Arc<RouteEntry>, RouteParams)> {
        let routes = self.routes.read().unwrap();
        let router = routes.get(method)?;
        match router.at(path) {
            Ok(matched) => Some((
                matched.value.clone(),
                RouteParams::from_match(&matched.params),
            )),
            Err(_) => None,
        }
    }
}

/// Translate httprouter placeholders to matchit syntax: `:name` becomes
/// `{name}`, `*name` becomes `{*name}`. Literal braces are escaped.
fn translate_pattern(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if let Some(name) = segment.strip_prefix(':') {
                format!("{{{name}}}")
            } else if let Some(name) = segment.strip_prefix('*') {
                format!("{{*{name}}}")
            } else {
                segment.replace('{', "{{").replace('}', "}}")
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::error::Error;

    fn entry() -> RouteEntry {
        RouteEntry {
            handler: Arc::new(|_ctx: Context| async move { Ok::<(), Error>(()) }),
            view: Arc::new(ViewState::new()),
        }
    }

    #[test]
    fn test_translate_pattern() {
        assert_eq!(translate_pattern("/users/:id"), "/users/{id}");
        assert_eq!(
            translate_pattern("/users/:id/posts/:post"),
            "/users/{id}/posts/{post}"
        );
        assert_eq!(translate_pattern("/files/*path"), "/files/{*path}");
        assert_eq!(translate_pattern("/plain"), "/plain");
    }

    #[test]
    fn test_register_and_lookup_with_params() {
        let mux = Mux::new();
        mux.register(Method::GET, "/users/:id", entry());
        let (_, params) = mux.lookup(&Method::GET, "/users/42").unwrap();
        assert_eq!(params.get("id"), Some("42"));
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_methods_are_isolated() {
        let mux = Mux::new();
        mux.register(Method::GET, "/resource", entry());
        assert!(mux.lookup(&Method::GET, "/resource").is_some());
        assert!(mux.lookup(&Method::POST, "/resource").is_none());
    }

    #[test]
    fn test_unmatched_path_returns_none() {
        let mux = Mux::new();
        mux.register(Method::GET, "/known", entry());
        assert!(mux.lookup(&Method::GET, "/unknown").is_none());
    }

    #[test]
    fn test_wildcard_captures_remainder() {
        let mux = Mux::new();
        mux.register(Method::GET, "/public/*filepath", entry());
        let (_, params) = mux.lookup(&Method::GET, "/public/css/app.css").unwrap();
        let captured = params.get("filepath").unwrap();
        assert!(captured.ends_with("css/app.css"));
    }

    #[test]
    #[should_panic(expected = "invalid route")]
    fn test_conflicting_routes_panic() {
        let mux = Mux::new();
        mux.register(Method::GET, "/users/:id", entry());
        mux.register(Method::GET, "/users/:name", entry());
    }
}
