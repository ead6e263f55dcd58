//! Path template matching and route ranking.
//!
//! Path templates use braces: `{name}` captures one path segment and
//! `{name*}` captures the rest of the path. Parameter names are any text
//! without `/`, `*` or `}`, so `{user-id}` and `{user.id}` are valid. An
//! empty final segment binds the parameter to `""`: `users/` matches
//! `users/{id}` with `id = ""`. A request path may match several
//! templates at once; all matches are collected and ranked so that
//!
//! 1. templates that bound no parameter (exact route definitions) come first,
//! 2. among equally weighted matches, templates with fewer placeholders win.
//!
//! With `""`, `"{id}"` and `"count"` registered, a request for `count`
//! therefore selects `"count"` and a request for `42` selects `"{id}"`.

use std::borrow::Cow;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use log::warn;
use regex::Regex;

/// Matches `{name}` and `{name*}` parameter declarations.
fn brace_param() -> &'static Regex {
    static BRACE_PARAM: OnceLock<Regex> = OnceLock::new();
    BRACE_PARAM.get_or_init(|| Regex::new(r"\{([^/}*]+)(\*?)\}").expect("static regex is valid"))
}

/// Matches any `{...}` placeholder.
fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{(.*?)\}").expect("static regex is valid"))
}

/// Prefixes a path with `/` unless it already starts with one.
fn rooted(path: &str) -> Cow<'_, str> {
    if path.starts_with('/') {
        Cow::Borrowed(path)
    } else {
        Cow::Owned(format!("/{path}"))
    }
}

/// Rewrites a brace template into matchit syntax: `{id}` becomes `:id` and
/// `{rest*}` becomes `*rest`.
pub fn translate(template: &str) -> String {
    brace_param()
        .replace_all(template, |caps: &regex::Captures<'_>| {
            let sigil = if caps[2].is_empty() { ":" } else { "*" };
            format!("{sigil}{}", &caps[1])
        })
        .into_owned()
}

/// Counts the `{...}` placeholders of a template.
pub fn placeholder_count(template: &str) -> usize {
    placeholder().find_iter(template).count()
}

/// One matched template for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    pub request_path: String,
    pub defined_path: String,
    pub path_parameters: HashMap<String, String>,
    /// 1 when no parameter was bound, 0 otherwise.
    pub weight: u8,
}

/// A template compiled for matching.
///
/// The router value is the name of a trailing parameter to bind to an empty
/// string, set on the extra route that stands for the template with its last
/// segment empty.
struct CompiledTemplate {
    defined_path: String,
    placeholders: usize,
    matcher: Option<matchit::Router<Option<String>>>,
}

impl CompiledTemplate {
    fn compile(defined_path: &str) -> Self {
        let route = translate(&rooted(defined_path));
        let mut matcher = matchit::Router::new();
        let compiled = match matcher.insert(route.clone(), None) {
            Ok(()) => {
                if let Some((prefix, name)) = empty_tail(&route) {
                    if let Err(e) = matcher.insert(prefix, Some(name)) {
                        warn!("Path template {defined_path:?} cannot match an empty tail: {e}");
                    }
                }
                Some(matcher)
            }
            Err(e) => {
                warn!("Path template {defined_path:?} cannot be compiled and will never match: {e}");
                None
            }
        };

        Self {
            defined_path: defined_path.to_string(),
            placeholders: placeholder_count(defined_path),
            matcher: compiled,
        }
    }

    fn matches(&self, request_path: &str) -> Option<RouteMatch> {
        let matcher = self.matcher.as_ref()?;
        let rooted_path = rooted(request_path);
        let matched = matcher.at(&rooted_path).ok()?;

        let mut path_parameters: HashMap<String, String> = matched
            .params
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        if let Some(name) = matched.value {
            path_parameters.insert(name.clone(), String::new());
        }

        Some(RouteMatch {
            request_path: request_path.to_string(),
            defined_path: self.defined_path.clone(),
            weight: if path_parameters.is_empty() { 1 } else { 0 },
            path_parameters,
        })
    }
}

impl fmt::Debug for CompiledTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledTemplate")
            .field("defined_path", &self.defined_path)
            .field("placeholders", &self.placeholders)
            .field("compiled", &self.matcher.is_some())
            .finish()
    }
}

/// The route standing for `route` with an empty last parameter segment.
///
/// Splits `/users/:id` into `("/users/", "id")` and `/files/*rest` into
/// `("/files", "rest")`.
fn empty_tail(route: &str) -> Option<(String, String)> {
    let (prefix, segment) = route.rsplit_once('/')?;
    let (sigil, name) = segment.split_at(segment.char_indices().nth(1)?.0);
    if name.is_empty() {
        return None;
    }
    match sigil {
        ":" => Some((format!("{prefix}/"), name.to_string())),
        "*" => {
            let prefix = if prefix.is_empty() { "/" } else { prefix };
            Some((prefix.to_string(), name.to_string()))
        }
        _ => None,
    }
}

/// Matches request paths against a fixed set of path templates.
#[derive(Debug, Default)]
pub struct Router {
    templates: Vec<CompiledTemplate>,
}

impl Router {
    /// Compiles the given templates. Duplicates are ignored.
    pub fn new<'a, I>(templates: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut paths: Vec<&str> = templates.into_iter().collect();
        paths.sort_unstable();
        paths.dedup();

        Self {
            templates: paths.into_iter().map(CompiledTemplate::compile).collect(),
        }
    }

    /// Every template accepted by `filter` that matches `request_path`, best
    /// match first.
    pub fn matches<F>(&self, request_path: &str, filter: F) -> Vec<RouteMatch>
    where
        F: Fn(&str) -> bool,
    {
        let mut ranked: Vec<(usize, RouteMatch)> = self
            .templates
            .iter()
            .filter(|template| filter(&template.defined_path))
            .filter_map(|template| {
                template
                    .matches(request_path)
                    .map(|route| (template.placeholders, route))
            })
            .collect();

        ranked.sort_by_key(|(placeholders, route)| (Reverse(route.weight), *placeholders));
        ranked.into_iter().map(|(_, route)| route).collect()
    }

    /// The best matching template accepted by `filter`.
    pub fn best_match<F>(&self, request_path: &str, filter: F) -> Option<RouteMatch>
    where
        F: Fn(&str) -> bool,
    {
        self.matches(request_path, filter).into_iter().next()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
