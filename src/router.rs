//! Route table and pre-navigation guard.
//!
//! Patterns are `/`-separated. A segment starting with `:` is a parameter;
//! `:id(\d+)` restricts it to ASCII digits. Child records extend their
//! parent's path, and a navigation matches the whole chain from the root
//! record down to the leaf.
//!
//! The guard is local and synchronous: it only asks whether a token is
//! present. It never validates the token, so a stale token passes; the server
//! still rejects it on the first request.

use crate::storage::TokenStore;

pub const LOGIN_PATH: &str = "/login";

/// Per-route metadata consulted at navigation time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteMeta {
    pub requires_auth: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Static(String),
    Param { name: String, numeric: bool },
}

impl Segment {
    fn parse(raw: &str) -> Self {
        let Some(param) = raw.strip_prefix(':') else {
            return Self::Static(raw.to_owned());
        };
        match param.strip_suffix(r"(\d+)") {
            Some(name) => Self::Param { name: name.to_owned(), numeric: true },
            None => Self::Param { name: param.to_owned(), numeric: false },
        }
    }

    /// Match one path part, pushing any captured parameter onto `out`.
    fn capture(&self, part: &str, out: &mut Vec<(String, String)>) -> bool {
        match self {
            Self::Static(s) => s == part,
            Self::Param { name, numeric } => {
                if *numeric && !part.bytes().all(|b| b.is_ascii_digit()) {
                    return false;
                }
                out.push((name.clone(), part.to_owned()));
                true
            }
        }
    }
}

fn split(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|part| !part.is_empty())
}

/// One entry of the route table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRecord {
    pub name: String,
    pub path: String,
    pub meta: RouteMeta,
    pub children: Vec<RouteRecord>,
    segments: Vec<Segment>,
}

impl RouteRecord {
    #[must_use]
    pub fn new(name: &str, path: &str, meta: RouteMeta) -> Self {
        Self {
            name: name.to_owned(),
            path: path.to_owned(),
            meta,
            children: Vec::new(),
            segments: split(path).map(Segment::parse).collect(),
        }
    }

    /// A route anyone may open.
    #[must_use]
    pub fn public(name: &str, path: &str) -> Self {
        Self::new(name, path, RouteMeta { requires_auth: false })
    }

    /// A route that needs a token.
    #[must_use]
    pub fn protected(name: &str, path: &str) -> Self {
        Self::new(name, path, RouteMeta { requires_auth: true })
    }

    #[must_use]
    pub fn with_children(mut self, children: Vec<RouteRecord>) -> Self {
        self.children = children;
        self
    }

    /// Match `parts` against this record and its children. On success the
    /// chain is returned leaf-last.
    fn matches<'r>(
        &'r self,
        parts: &[&str],
        chain: &mut Vec<&'r RouteRecord>,
        params: &mut Vec<(String, String)>,
    ) -> bool {
        if parts.len() < self.segments.len() {
            return false;
        }
        let mut captured = Vec::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            if !segment.capture(part, &mut captured) {
                return false;
            }
        }
        let rest = &parts[self.segments.len()..];

        let params_before = params.len();
        params.extend(captured);
        chain.push(self);

        if rest.is_empty() {
            return true;
        }
        for child in &self.children {
            if child.matches(rest, chain, params) {
                return true;
            }
        }

        chain.pop();
        params.truncate(params_before);
        false
    }
}

/// A resolved navigation target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<'r> {
    /// Matched records, root first.
    pub matched: Vec<&'r RouteRecord>,
    /// Captured parameters in pattern order.
    pub params: Vec<(String, String)>,
}

impl RouteMatch<'_> {
    #[must_use]
    pub fn requires_auth(&self) -> bool {
        self.matched.iter().any(|r| r.meta.requires_auth)
    }

    /// Name of the leaf record.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.matched.last().map(|r| r.name.as_str())
    }

    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Guard decision for one navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Navigate to the requested target unchanged.
    Proceed,
    /// Navigate here instead.
    Redirect(String),
}

// =============================================================================
// ROUTER
// =============================================================================

#[derive(Debug, Clone)]
pub struct Router {
    routes: Vec<RouteRecord>,
    login_path: String,
}

impl Router {
    #[must_use]
    pub fn new(routes: Vec<RouteRecord>) -> Self {
        Self { routes, login_path: LOGIN_PATH.to_owned() }
    }

    /// The platform's page table.
    #[must_use]
    pub fn campus() -> Self {
        Self::new(vec![
            RouteRecord::public("login", "/login"),
            RouteRecord::public("register", "/register"),
            RouteRecord::protected("profile", "/profile"),
            RouteRecord::protected("user-profile", r"/profile/:id(\d+)"),
            RouteRecord::protected("course", r"/course/:id(\d+)"),
            RouteRecord::protected("course-create", "/courses/create"),
            RouteRecord::protected("lesson", r"/lesson/:id(\d+)"),
            RouteRecord::protected("course-input-test", "/course/:courseId/input-test"),
            RouteRecord::protected("lesson-test", "/lesson/:lessonId/test"),
        ])
    }

    #[must_use]
    pub fn routes(&self) -> &[RouteRecord] {
        &self.routes
    }

    #[must_use]
    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    /// Resolve `target` (query string and fragment ignored) to the first
    /// matching record chain in table order.
    #[must_use]
    pub fn resolve(&self, target: &str) -> Option<RouteMatch<'_>> {
        let path = target
            .split(['?', '#'])
            .next()
            .unwrap_or_default();
        let parts: Vec<&str> = split(path).collect();

        for route in &self.routes {
            let mut matched = Vec::new();
            let mut params = Vec::new();
            if route.matches(&parts, &mut matched, &mut params) {
                return Some(RouteMatch { matched, params });
            }
        }
        None
    }

    /// Decide a navigation given whether a token is present. Unknown paths
    /// proceed, since no record on them requires auth.
    #[must_use]
    pub fn guard(&self, target: &str, token_present: bool) -> Navigation {
        let requires_auth = self
            .resolve(target)
            .is_some_and(|m| m.requires_auth());
        if requires_auth && !token_present {
            tracing::debug!(path = target, redirect = %self.login_path, "navigation requires auth");
            return Navigation::Redirect(self.login_path.clone());
        }
        Navigation::Proceed
    }

    /// Run the guard against the persisted token slot. An unreadable slot
    /// counts as no token.
    pub fn before_each(&self, target: &str, storage: &impl TokenStore) -> Navigation {
        let token_present = match storage.load() {
            Ok(token) => token.is_some(),
            Err(e) => {
                tracing::warn!(error = %e, "token storage unreadable during navigation");
                false
            }
        };
        self.guard(target, token_present)
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::campus()
    }
}

#[cfg(test)]
#[path = "router_test.rs"]
mod tests;
