//! Serde data structures for the Waypoint endpoint file.
//!
//! Contains [`Config`] (the root), [`EndpointConfig`] and [`Defaults`]. All
//! types derive `Serialize` and `Deserialize` with `deny_unknown_fields`
//! for strict parsing. [`Config::to_endpoints`] and
//! [`Config::constraint_map`] turn a parsed file into library types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{PatternError, PolicyError};
use crate::routing::constraints::{ConstraintMap, ParameterPolicyFactory};
use crate::routing::endpoint::{Endpoint, EndpointBuilder};
use crate::routing::metadata::{
    AcceptsMetadata, HostMetadata, HttpMethodMetadata, SuppressMatchingMetadata,
};
use crate::routing::pattern::{PolicyReference, RoutePattern};
use crate::routing::values::RouteValueDictionary;

fn default_methods() -> Vec<String> {
    vec!["*".to_string()]
}

fn is_default_methods(v: &[String]) -> bool {
    v.len() == 1 && v[0] == "*"
}

fn is_zero(v: &i32) -> bool {
    *v == 0
}

fn is_false(v: &bool) -> bool {
    !*v
}

fn is_default_defaults(v: &Defaults) -> bool {
    v.order == 0 && is_default_methods(&v.methods)
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default, skip_serializing_if = "is_default_defaults")]
    pub defaults: Defaults,

    /// Named regular expressions usable as constraints, e.g. `slug`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub constraints: BTreeMap<String, String>,

    pub endpoints: Vec<EndpointConfig>,
}

/// Values an endpoint inherits when it leaves them unset.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Defaults {
    #[serde(default, skip_serializing_if = "is_zero")]
    pub order: i32,

    #[serde(
        default = "default_methods",
        skip_serializing_if = "is_default_methods"
    )]
    pub methods: Vec<String>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            order: 0,
            methods: default_methods(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointConfig {
    pub template: String,

    /// Display name; the template when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub methods: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hosts: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accepts: Vec<String>,

    /// Accept requests without a `Content-Type` even when `accepts` is set.
    #[serde(default, skip_serializing_if = "is_false")]
    pub accepts_optional: bool,

    /// Out-of-line parameter defaults.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub defaults: BTreeMap<String, String>,

    /// Out-of-line constraint references per parameter, in the inline
    /// syntax (`int`, `range(1,10)`, `regex(^a+$)`).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub constraints: BTreeMap<String, Vec<String>>,

    /// Opaque value reported back on a match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub suppress_matching: bool,
}

impl EndpointConfig {
    /// Identifier used in diagnostics.
    #[must_use]
    pub fn id(&self, index: usize) -> String {
        match (&self.name, self.template.is_empty()) {
            (Some(name), _) => name.clone(),
            (None, false) => self.template.clone(),
            (None, true) => format!("endpoints[{index}]"),
        }
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.template)
    }

    pub fn pattern(&self) -> Result<RoutePattern, PatternError> {
        let defaults: RouteValueDictionary = self
            .defaults
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        let policies = self.constraints.iter().map(|(parameter, references)| {
            (
                parameter.clone(),
                references.iter().map(PolicyReference::content).collect(),
            )
        });
        RoutePattern::parse_with(&self.template, &defaults, policies)
    }

    pub fn to_endpoint(&self, defaults: &Defaults) -> Result<Endpoint, PatternError> {
        let methods = self.methods.as_ref().unwrap_or(&defaults.methods);

        let mut builder = EndpointBuilder::new(self.pattern()?)
            .order(self.order.unwrap_or(defaults.order))
            .metadata(HttpMethodMetadata::new(methods));
        if let Some(ref name) = self.name {
            builder = builder.display_name(name.as_str());
        }
        if !self.hosts.is_empty() {
            builder = builder.metadata(HostMetadata::new(&self.hosts));
        }
        if !self.accepts.is_empty() {
            builder = builder.metadata(AcceptsMetadata::new(&self.accepts, self.accepts_optional));
        }
        if let Some(ref target) = self.target {
            builder = builder.target(target.as_str());
        }
        if self.suppress_matching {
            builder = builder.metadata(SuppressMatchingMetadata);
        }
        Ok(builder.build())
    }
}

impl Config {
    pub fn to_endpoints(&self) -> Result<Vec<Endpoint>, PatternError> {
        self.endpoints
            .iter()
            .map(|e| e.to_endpoint(&self.defaults))
            .collect()
    }

    /// The built-in constraints plus the regex aliases of this file.
    pub fn constraint_map(&self) -> Result<ConstraintMap, PolicyError> {
        let mut map = ConstraintMap::with_builtins();
        for (name, pattern) in &self.constraints {
            map.register_regex_alias(name, pattern)?;
        }
        Ok(map)
    }

    pub fn policy_factory(&self) -> Result<ParameterPolicyFactory, PolicyError> {
        self.constraint_map().map(ParameterPolicyFactory::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(template: &str) -> EndpointConfig {
        EndpointConfig {
            template: template.into(),
            ..EndpointConfig::default()
        }
    }

    #[test]
    fn endpoint_inherits_defaults() {
        let defaults = Defaults {
            order: 3,
            methods: vec!["get".into()],
        };
        let built = endpoint("/a").to_endpoint(&defaults).unwrap();
        assert_eq!(built.order(), 3);
        assert_eq!(built.display_name(), "/a");
        let methods = built.metadata().get_metadata::<HttpMethodMetadata>().unwrap();
        assert_eq!(methods.methods(), ["GET"]);
    }

    #[test]
    fn out_of_line_values_reach_the_pattern() {
        let mut config = endpoint("/p/{id}");
        config.defaults.insert("format".into(), "json".into());
        config.constraints.insert("id".into(), vec!["int".into()]);
        config.name = Some("product".into());
        config.target = Some("catalog".into());

        let built = config.to_endpoint(&Defaults::default()).unwrap();
        assert_eq!(built.display_name(), "product");
        assert_eq!(built.target(), Some("catalog"));
        assert_eq!(built.route_pattern().defaults().get("format"), Some("json"));
        assert_eq!(built.route_pattern().parameter("id").unwrap().policies.len(), 1);
    }

    #[test]
    fn regex_aliases_are_registered() {
        let config = Config {
            defaults: Defaults::default(),
            constraints: [("slug".to_string(), "^[a-z-]+$".to_string())].into(),
            endpoints: vec![],
        };
        let map = config.constraint_map().unwrap();
        assert!(map.contains("slug"));
        assert!(map.contains("int"));
    }
}
