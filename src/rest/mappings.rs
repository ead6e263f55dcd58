//! The top-level registry of path templates.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::rest::error::MappingError;
use crate::rest::method::HandlerConfiguration;
use crate::rest::resource::Resource;

/// Resources keyed by their path template.
///
/// Templates are compared as plain strings: `users` and `users/` are two
/// different resources.
#[derive(Debug, Clone, Default)]
pub struct ResourceMappings {
    resources: HashMap<String, Resource>,
}

impl ResourceMappings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the resource for `path`, creating it if needed.
    pub fn resource(&mut self, path: &str) -> &mut Resource {
        self.resources
            .entry(path.to_string())
            .or_insert_with(|| Resource::new(path))
    }

    /// Returns the resource for `path`, creating it from `configuration` if
    /// needed. An existing resource is returned untouched.
    pub fn resource_with<I, V>(&mut self, path: &str, configuration: I) -> &mut Resource
    where
        I: IntoIterator<Item = (V, Vec<HandlerConfiguration>)>,
        V: AsRef<str>,
    {
        self.resources
            .entry(path.to_string())
            .or_insert_with(|| Resource::with_configuration(path, configuration))
    }

    pub fn get(&self, path: &str) -> Option<&Resource> {
        self.resources.get(path)
    }

    pub fn get_mut(&mut self, path: &str) -> Option<&mut Resource> {
        self.resources.get_mut(path)
    }

    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    /// The mapped path templates, in no particular order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Finds the handler entry of `path` with exactly the given constraints.
    pub fn find(
        &self,
        path: &str,
        verb: Option<&str>,
        consumes: Option<&[String]>,
        produces: Option<&[String]>,
    ) -> Option<&HandlerConfiguration> {
        self.resources.get(path)?.find(verb, consumes, produces)
    }

    /// Removes the handler entries of `path` with exactly the given constraints.
    pub fn disable(
        &mut self,
        path: &str,
        verb: Option<&str>,
        consumes: Option<&[String]>,
        produces: Option<&[String]>,
    ) -> Result<&mut Self, MappingError> {
        self.resources
            .get_mut(path)
            .ok_or_else(|| MappingError::UnknownResource(path.to_string()))?
            .disable(verb, consumes, produces);
        Ok(self)
    }

    /// Makes every resource read-only. See [`Resource::readonly`].
    pub fn readonly(&mut self) -> &mut Self {
        for resource in self.resources.values_mut() {
            resource.readonly();
        }
        self
    }

    /// Describes the mappings in their serializable form.
    pub fn describe(&self) -> MappingsDescriptor {
        self.resources
            .iter()
            .map(|(path, resource)| {
                let verbs: BTreeMap<String, Vec<HandlerDescriptor>> = resource
                    .tables()
                    .map(|(verb, entries)| {
                        let handlers = entries.iter().map(HandlerDescriptor::from).collect::<Vec<_>>();
                        (verb.to_string(), handlers)
                    })
                    .collect();
                (path.clone(), verbs)
            })
            .collect()
    }
}

/// Serializable form of [`ResourceMappings`]:
/// `{ "<path template>": { "<verb>": [ <handler>, ... ] } }`.
pub type MappingsDescriptor = BTreeMap<String, BTreeMap<String, Vec<HandlerDescriptor>>>;

/// Serializable form of one [`HandlerConfiguration`]. Callbacks are reported
/// by presence only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub produces: Option<Vec<String>>,
    #[serde(default)]
    pub before: bool,
    #[serde(default)]
    pub serve: bool,
    #[serde(default)]
    pub catch: bool,
    #[serde(default)]
    pub finally: bool,
}

impl From<&HandlerConfiguration> for HandlerDescriptor {
    fn from(configuration: &HandlerConfiguration) -> Self {
        Self {
            consumes: configuration.consumes.clone(),
            produces: configuration.produces.clone(),
            before: configuration.before.is_some(),
            serve: configuration.serve.is_some(),
            catch: configuration.catch.is_some(),
            finally: configuration.finally.is_some(),
        }
    }
}
