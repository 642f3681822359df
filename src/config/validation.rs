//! Configuration validation with detailed error reporting.
//!
//! The [`validate`] function checks a parsed [`Config`] for problems that
//! would otherwise only surface when the matcher is built: malformed
//! templates, bad HTTP methods, duplicate names, invalid regex aliases and
//! constraint references that do not resolve. Returns a list of
//! [`ValidationError`] values with per-field suggestions.

use std::collections::HashSet;

use super::model::{Config, EndpointConfig};
use crate::error::{PolicyError, ValidationError};
use crate::routing::constraints::ParameterPolicyFactory;

/// Validate an HTTP method string. Returns `Ok(())` or a human-readable error.
pub fn validate_method(method: &str) -> Result<(), String> {
    if method == "*" || http::Method::from_bytes(method.as_bytes()).is_ok() {
        Ok(())
    } else {
        Err(format!("'{method}' is not a valid HTTP method"))
    }
}

/// Validate a `type/subtype` media range. Returns `Ok(())` or a
/// human-readable error.
pub fn validate_media_type(media_type: &str) -> Result<(), String> {
    let essence = media_type.split(';').next().unwrap_or("").trim();
    match essence.split_once('/') {
        Some((kind, sub)) if !kind.is_empty() && !sub.is_empty() && !sub.contains('/') => {
            if kind == "*" && sub != "*" {
                Err(format!("'{media_type}' is not a valid media range"))
            } else {
                Ok(())
            }
        }
        _ => Err(format!("'{media_type}' is not a valid media type")),
    }
}

pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.endpoints.is_empty() {
        errors.push(ValidationError {
            endpoint: "(root)".into(),
            field: "endpoints".into(),
            message: "at least one endpoint must be defined".into(),
            suggestion: None,
        });
        return Err(errors);
    }

    for method in &config.defaults.methods {
        if let Err(msg) = validate_method(method) {
            errors.push(ValidationError {
                endpoint: "(root)".into(),
                field: "defaults.methods".into(),
                message: msg,
                suggestion: None,
            });
        }
    }

    let factory = match config.constraint_map() {
        Ok(map) => Some(ParameterPolicyFactory::new(map)),
        Err(e) => {
            let alias = match &e {
                PolicyError::InvalidArguments { name, .. } => name.clone(),
                other => other.to_string(),
            };
            errors.push(ValidationError {
                endpoint: "(root)".into(),
                field: format!("constraints.{alias}"),
                message: e.to_string(),
                suggestion: Some("check the regular expression syntax".into()),
            });
            None
        }
    };

    let mut seen_names = HashSet::new();

    for (i, endpoint) in config.endpoints.iter().enumerate() {
        let id = endpoint.id(i);

        if !seen_names.insert(endpoint.display_name()) {
            errors.push(ValidationError {
                endpoint: id.clone(),
                field: (if endpoint.name.is_some() { "name" } else { "template" }).into(),
                message: format!("duplicate endpoint name '{}'", endpoint.display_name()),
                suggestion: Some("give each endpoint a distinct 'name'".into()),
            });
        }

        for method in endpoint.methods.iter().flatten() {
            if let Err(msg) = validate_method(method) {
                errors.push(ValidationError {
                    endpoint: id.clone(),
                    field: "methods".into(),
                    message: msg,
                    suggestion: None,
                });
            }
        }

        for host in &endpoint.hosts {
            if host.trim().is_empty() {
                errors.push(ValidationError {
                    endpoint: id.clone(),
                    field: "hosts".into(),
                    message: "host pattern cannot be empty".into(),
                    suggestion: Some("use '*' to accept any host".into()),
                });
            }
        }

        for media_type in &endpoint.accepts {
            if let Err(msg) = validate_media_type(media_type) {
                errors.push(ValidationError {
                    endpoint: id.clone(),
                    field: "accepts".into(),
                    message: msg,
                    suggestion: Some("expected 'type/subtype', 'type/*' or '*/*'".into()),
                });
            }
        }

        validate_pattern(endpoint, &id, factory.as_ref(), &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_pattern(
    endpoint: &EndpointConfig,
    id: &str,
    factory: Option<&ParameterPolicyFactory>,
    errors: &mut Vec<ValidationError>,
) {
    let pattern = match endpoint.pattern() {
        Ok(pattern) => pattern,
        Err(e) => {
            errors.push(ValidationError {
                endpoint: id.to_string(),
                field: "template".into(),
                message: e.kind.to_string(),
                suggestion: None,
            });
            return;
        }
    };

    let Some(factory) = factory else {
        return;
    };
    for (key, references) in pattern.parameter_policies() {
        for reference in references {
            if let Err(e) = factory.create(key, pattern.parameter(key), reference) {
                let suggestion = match e {
                    PolicyError::UnknownName { ref name, .. } => Some(format!(
                        "register '{name}' under the top-level 'constraints' map"
                    )),
                    _ => None,
                };
                errors.push(ValidationError {
                    endpoint: id.to_string(),
                    field: format!("constraints.{key}"),
                    message: e.to_string(),
                    suggestion,
                });
            }
        }
    }
}

#[must_use]
pub fn format_validation_report(path: &str, config: &Config) -> String {
    let mut lines = vec![format!("  {} endpoints\n", config.endpoints.len())];

    for endpoint in &config.endpoints {
        let methods = endpoint
            .methods
            .as_ref()
            .unwrap_or(&config.defaults.methods)
            .join(", ");
        let order = endpoint.order.unwrap_or(config.defaults.order);

        lines.push(format!(
            "  {}  -> {}",
            endpoint.display_name(),
            endpoint.target.as_deref().unwrap_or("(no target)")
        ));
        if endpoint.name.is_some() {
            lines.push(format!("    template: {}", endpoint.template));
        }
        lines.push(format!("    methods: {methods}"));
        lines.push(format!("    order: {order}"));
        if !endpoint.hosts.is_empty() {
            lines.push(format!("    hosts: {}", endpoint.hosts.join(", ")));
        }
        if !endpoint.accepts.is_empty() {
            lines.push(format!("    accepts: {}", endpoint.accepts.join(", ")));
        }
        if endpoint.suppress_matching {
            lines.push("    suppressed from matching".into());
        }
    }

    format!("{} is valid\n{}", path, lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::Defaults;

    fn config(endpoints: Vec<EndpointConfig>) -> Config {
        Config {
            defaults: Defaults::default(),
            constraints: Default::default(),
            endpoints,
        }
    }

    fn endpoint(template: &str) -> EndpointConfig {
        EndpointConfig {
            template: template.into(),
            ..EndpointConfig::default()
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(validate(&config(vec![endpoint("/products/{id:int}")])).is_ok());
    }

    #[test]
    fn empty_endpoints_fails() {
        let errors = validate(&config(vec![])).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("at least one endpoint"));
    }

    #[test]
    fn malformed_template_fails() {
        let errors = validate(&config(vec![endpoint("/a/{id")])).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.field == "template" && e.message.contains("incomplete parameter")));
    }

    #[test]
    fn unknown_constraint_suggests_registration() {
        let errors = validate(&config(vec![endpoint("/a/{id:slug}")])).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "constraints.id"
            && e.suggestion.as_deref()
                == Some("register 'slug' under the top-level 'constraints' map")));
    }

    #[test]
    fn registered_alias_resolves() {
        let mut cfg = config(vec![endpoint("/a/{id:slug}")]);
        cfg.constraints.insert("slug".into(), "^[a-z-]+$".into());
        assert!(validate(&cfg).is_ok());
    }

    #[test]
    fn invalid_alias_regex_fails() {
        let mut cfg = config(vec![endpoint("/a")]);
        cfg.constraints.insert("broken".into(), "([a-z".into());
        let errors = validate(&cfg).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "constraints.broken"));
    }

    #[test]
    fn duplicate_names_fail() {
        let errors = validate(&config(vec![endpoint("/a"), endpoint("/a")])).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.message.contains("duplicate endpoint name")));
    }

    #[test]
    fn invalid_method_fails() {
        let mut e = endpoint("/a");
        e.methods = Some(vec!["GE T".into()]);
        let errors = validate(&config(vec![e])).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.message.contains("not a valid HTTP method")));
    }

    #[test]
    fn media_types() {
        assert!(validate_media_type("application/json").is_ok());
        assert!(validate_media_type("text/*").is_ok());
        assert!(validate_media_type("*/*").is_ok());
        assert!(validate_media_type("json").is_err());
        assert!(validate_media_type("*/json").is_err());
    }
}
