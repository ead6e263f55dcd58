//! A single URL path template and its verb table.

use std::collections::BTreeMap;

use crate::rest::exchange::Exchange;
use crate::rest::method::{HandlerConfiguration, HandlerResult, ResourceMethod};

/// Verbs kept by [`Resource::readonly`].
const READ_VERBS: [&str; 3] = ["get", "head", "trace"];

/// A path template together with its handler configurations, keyed by
/// lowercase HTTP verb.
#[derive(Debug, Clone, Default)]
pub struct Resource {
    path: String,
    methods: BTreeMap<String, Vec<HandlerConfiguration>>,
}

impl Resource {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            methods: BTreeMap::new(),
        }
    }

    /// Creates a resource from prepared verb tables.
    ///
    /// Verbs are lowercased; entries are registered one by one, so entries
    /// with equal constraints under the same verb are merged.
    pub fn with_configuration<I, V>(path: impl Into<String>, configuration: I) -> Self
    where
        I: IntoIterator<Item = (V, Vec<HandlerConfiguration>)>,
        V: AsRef<str>,
    {
        let mut resource = Self::new(path);
        for (verb, handlers) in configuration {
            resource.methods(verb.as_ref(), handlers);
        }
        resource
    }

    /// The path template.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Registers a handler configuration for `verb`.
    ///
    /// If an entry with exactly equal `consumes` and `produces` already
    /// exists, the properties set on `configuration` are merged into it;
    /// otherwise it is appended. Returns access to the affected entry.
    pub fn method(&mut self, verb: &str, configuration: HandlerConfiguration) -> ResourceMethod<'_> {
        let verb = verb.to_lowercase();
        let index = self.register(&verb, configuration);
        let entries = self.methods.entry(verb).or_default();
        ResourceMethod::new(&mut entries[index])
    }

    /// Registers several handler configurations for `verb` at once.
    ///
    /// Returns access to every affected entry, in table order. Configurations
    /// merged into the same entry yield one accessor.
    pub fn methods<I>(&mut self, verb: &str, configurations: I) -> Vec<ResourceMethod<'_>>
    where
        I: IntoIterator<Item = HandlerConfiguration>,
    {
        let verb = verb.to_lowercase();
        let mut touched = Vec::new();
        for configuration in configurations {
            let index = self.register(&verb, configuration);
            if !touched.contains(&index) {
                touched.push(index);
            }
        }

        self.methods
            .entry(verb)
            .or_default()
            .iter_mut()
            .enumerate()
            .filter(|(index, _)| touched.contains(index))
            .map(|(_, configuration)| ResourceMethod::new(configuration))
            .collect()
    }

    fn register(&mut self, verb: &str, configuration: HandlerConfiguration) -> usize {
        let entries = self.methods.entry(verb.to_string()).or_default();
        let existing = entries.iter().position(|entry| {
            entry.has_constraints(configuration.consumes.as_deref(), configuration.produces.as_deref())
        });

        match existing {
            Some(index) => {
                entries[index].merge(configuration);
                index
            }
            None => {
                entries.push(configuration);
                entries.len() - 1
            }
        }
    }

    pub fn get(&mut self) -> ResourceMethod<'_> {
        self.method("get", HandlerConfiguration::default())
    }

    pub fn post(&mut self) -> ResourceMethod<'_> {
        self.method("post", HandlerConfiguration::default())
    }

    pub fn put(&mut self) -> ResourceMethod<'_> {
        self.method("put", HandlerConfiguration::default())
    }

    pub fn delete(&mut self) -> ResourceMethod<'_> {
        self.method("delete", HandlerConfiguration::default())
    }

    pub fn patch(&mut self) -> ResourceMethod<'_> {
        self.method("patch", HandlerConfiguration::default())
    }

    /// Registers `serve` for `verb` in a fresh entry without MIME constraints.
    pub fn serve_with<F>(&mut self, verb: &str, serve: F) -> ResourceMethod<'_>
    where
        F: Fn(&mut Exchange<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        self.method(verb, HandlerConfiguration::default()).serve(serve)
    }

    pub fn get_with<F>(&mut self, serve: F) -> ResourceMethod<'_>
    where
        F: Fn(&mut Exchange<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        self.serve_with("get", serve)
    }

    pub fn post_with<F>(&mut self, serve: F) -> ResourceMethod<'_>
    where
        F: Fn(&mut Exchange<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        self.serve_with("post", serve)
    }

    pub fn put_with<F>(&mut self, serve: F) -> ResourceMethod<'_>
    where
        F: Fn(&mut Exchange<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        self.serve_with("put", serve)
    }

    pub fn delete_with<F>(&mut self, serve: F) -> ResourceMethod<'_>
    where
        F: Fn(&mut Exchange<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        self.serve_with("delete", serve)
    }

    pub fn patch_with<F>(&mut self, serve: F) -> ResourceMethod<'_>
    where
        F: Fn(&mut Exchange<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        self.serve_with("patch", serve)
    }

    /// Finds the first entry with exactly the given constraints.
    ///
    /// Searches `verb` only, or every verb when `verb` is `None`.
    pub fn find(
        &self,
        verb: Option<&str>,
        consumes: Option<&[String]>,
        produces: Option<&[String]>,
    ) -> Option<&HandlerConfiguration> {
        let verb = verb.map(str::to_lowercase);
        self.methods
            .iter()
            .filter(|(name, _)| verb.as_deref().map_or(true, |verb| verb == name.as_str()))
            .flat_map(|(_, entries)| entries.iter())
            .find(|entry| entry.has_constraints(consumes, produces))
    }

    /// Like [`Resource::find`], returning builder access to the entry.
    pub fn find_mut(
        &mut self,
        verb: Option<&str>,
        consumes: Option<&[String]>,
        produces: Option<&[String]>,
    ) -> Option<ResourceMethod<'_>> {
        let verb = verb.map(str::to_lowercase);
        self.methods
            .iter_mut()
            .filter(|(name, _)| verb.as_deref().map_or(true, |verb| verb == name.as_str()))
            .flat_map(|(_, entries)| entries.iter_mut())
            .find(|entry| entry.has_constraints(consumes, produces))
            .map(ResourceMethod::new)
    }

    /// Removes the entries with exactly the given constraints.
    ///
    /// Applies to `verb` only, or to every verb when `verb` is `None`.
    /// The verb table itself stays in place, even when emptied.
    pub fn disable(
        &mut self,
        verb: Option<&str>,
        consumes: Option<&[String]>,
        produces: Option<&[String]>,
    ) -> &mut Self {
        let verb = verb.map(str::to_lowercase);
        for (name, entries) in self.methods.iter_mut() {
            if verb.as_deref().map_or(true, |verb| verb == name.as_str()) {
                entries.retain(|entry| !entry.has_constraints(consumes, produces));
            }
        }
        self
    }

    /// Drops every verb table except `get`, `head` and `trace`.
    pub fn readonly(&mut self) -> &mut Self {
        self.methods.retain(|verb, _| READ_VERBS.contains(&verb.as_str()));
        self
    }

    /// The entries registered for `verb`, in registration order.
    pub fn handlers(&self, verb: &str) -> &[HandlerConfiguration] {
        self.methods
            .get(&verb.to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Whether a verb table exists for `verb`.
    pub fn handles(&self, verb: &str) -> bool {
        self.methods.contains_key(&verb.to_lowercase())
    }

    /// The registered verbs, lowercase and sorted.
    pub fn verbs(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    pub(crate) fn tables(&self) -> impl Iterator<Item = (&str, &[HandlerConfiguration])> {
        self.methods
            .iter()
            .map(|(verb, entries)| (verb.as_str(), entries.as_slice()))
    }
}
