//! Route table
//!
//! Holds registered rules in registration order and resolves a
//! (method, path) pair to a route, an automatic OPTIONS answer, a 405 or a 404.

use hyper::Method;

use super::pattern::{PathParams, RoutePattern};
use super::RoutingError;

/// A registered rule bound to an endpoint and its handler
#[derive(Debug)]
pub struct Route<T> {
    endpoint: String,
    pattern: RoutePattern,
    methods: Vec<Method>,
    target: T,
}

/// Outcome of resolving a request against the table
#[derive(Debug)]
pub enum Resolution<'a, T> {
    /// A rule matched and accepts the method
    Matched {
        route: &'a Route<T>,
        params: PathParams,
    },
    /// OPTIONS on a known path; carries every method the path accepts
    Options { allowed: Vec<Method> },
    /// The path is known but not under this method
    MethodNotAllowed { allowed: Vec<Method> },
    NotFound,
}

/// Ordered collection of routes
#[derive(Debug)]
pub struct RouteTable<T> {
    routes: Vec<Route<T>>,
}

impl<T> Route<T> {
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub const fn pattern(&self) -> &RoutePattern {
        &self.pattern
    }

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    pub const fn target(&self) -> &T {
        &self.target
    }

    fn allows(&self, method: &Method) -> bool {
        self.methods.contains(method)
    }
}

impl<T> RouteTable<T> {
    pub const fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Register `target` under `endpoint` for `rule`.
    ///
    /// `HEAD` is added whenever `GET` is accepted, and `OPTIONS` is always
    /// added.
    pub fn add(
        &mut self,
        endpoint: &str,
        rule: &str,
        methods: &[Method],
        target: T,
    ) -> Result<(), RoutingError> {
        if self.routes.iter().any(|r| r.endpoint == endpoint) {
            return Err(RoutingError::DuplicateEndpoint(endpoint.to_string()));
        }

        let pattern = RoutePattern::parse(rule).map_err(|source| RoutingError::InvalidRule {
            rule: rule.to_string(),
            source,
        })?;

        let mut all_methods = methods.to_vec();
        if all_methods.contains(&Method::GET) {
            all_methods.push(Method::HEAD);
        }
        all_methods.push(Method::OPTIONS);
        sort_methods(&mut all_methods);

        self.routes.push(Route {
            endpoint: endpoint.to_string(),
            pattern,
            methods: all_methods,
            target,
        });
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Route<T>> {
        self.routes.iter()
    }

    /// Resolve a decoded request path.
    ///
    /// The first rule that matches the path and accepts the method wins.
    pub fn resolve(&self, method: &Method, path: &str) -> Resolution<'_, T> {
        let mut allowed: Vec<Method> = Vec::new();

        for route in &self.routes {
            let Some(params) = route.pattern.matches(path) else {
                continue;
            };

            if *method != Method::OPTIONS && route.allows(method) {
                return Resolution::Matched { route, params };
            }

            for m in &route.methods {
                if !allowed.contains(m) {
                    allowed.push(m.clone());
                }
            }
        }

        if allowed.is_empty() {
            return Resolution::NotFound;
        }

        sort_methods(&mut allowed);
        if *method == Method::OPTIONS {
            Resolution::Options { allowed }
        } else {
            Resolution::MethodNotAllowed { allowed }
        }
    }
}

impl<T> Default for RouteTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Render methods as an `Allow` header value
pub fn allow_header(methods: &[Method]) -> String {
    methods
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

fn sort_methods(methods: &mut Vec<Method>) {
    methods.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    methods.dedup();
}
