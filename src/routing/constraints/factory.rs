//! Resolution of policy references into policy instances.
//!
//! Inline references are written `name` or `name(arguments)`. The name is
//! looked up case-insensitively in a [`ConstraintMap`]; the constructor it
//! maps to receives the raw argument text (everything between the first
//! `(` and the final `)`), so `regex(...)` arguments may contain commas and
//! parentheses.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::builtin::{
    AlphaConstraint, BoolConstraint, DateTimeConstraint, DecimalConstraint, DoubleConstraint,
    FileNameConstraint, FloatConstraint, GuidConstraint, IntConstraint, LengthConstraint,
    LongConstraint, MaxConstraint, MaxLengthConstraint, MinConstraint, MinLengthConstraint,
    NonFileNameConstraint, RangeConstraint, RegexConstraint, RequiredConstraint,
};
use super::{OptionalConstraint, ParameterPolicy};
use crate::error::PolicyError;
use crate::routing::pattern::{ParameterPart, PolicyReference};

/// Builds a policy from the argument text of a reference (`None` when the
/// reference has no parentheses). An `Err` carries the reason the
/// arguments were rejected.
pub type PolicyConstructor =
    Arc<dyn Fn(Option<&str>) -> Result<Arc<dyn ParameterPolicy>, String> + Send + Sync>;

/// Name → constructor map used to resolve inline policy references.
#[derive(Clone)]
pub struct ConstraintMap {
    entries: HashMap<String, PolicyConstructor>,
}

impl ConstraintMap {
    /// A map without any registered names.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// A map seeded with the built-in constraints.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut map = Self::empty();
        map.register_simple("int", || IntConstraint);
        map.register_simple("long", || LongConstraint);
        map.register_simple("bool", || BoolConstraint);
        map.register_simple("guid", || GuidConstraint);
        map.register_simple("decimal", || DecimalConstraint);
        map.register_simple("double", || DoubleConstraint);
        map.register_simple("float", || FloatConstraint);
        map.register_simple("datetime", || DateTimeConstraint);
        map.register_simple("alpha", || AlphaConstraint);
        map.register_simple("required", || RequiredConstraint);
        map.register_simple("file", || FileNameConstraint);
        map.register_simple("nonfile", || NonFileNameConstraint);

        map.register("length", |args| match parse_args::<usize>("length", args)?.as_slice() {
            [n] => Ok(Arc::new(LengthConstraint::exact(*n)) as Arc<dyn ParameterPolicy>),
            [min, max] if min <= max => Ok(Arc::new(LengthConstraint {
                min: *min,
                max: *max,
            })),
            [_, _] => Err("the minimum length must not exceed the maximum".to_string()),
            _ => Err("expected one or two arguments".to_string()),
        });
        map.register("minlength", |args| {
            let [n] = single::<usize>("minlength", args)?;
            Ok(Arc::new(MinLengthConstraint(n)))
        });
        map.register("maxlength", |args| {
            let [n] = single::<usize>("maxlength", args)?;
            Ok(Arc::new(MaxLengthConstraint(n)))
        });
        map.register("min", |args| {
            let [n] = single::<i64>("min", args)?;
            Ok(Arc::new(MinConstraint(n)))
        });
        map.register("max", |args| {
            let [n] = single::<i64>("max", args)?;
            Ok(Arc::new(MaxConstraint(n)))
        });
        map.register("range", |args| match parse_args::<i64>("range", args)?.as_slice() {
            [min, max] if min <= max => Ok(Arc::new(RangeConstraint {
                min: *min,
                max: *max,
            }) as Arc<dyn ParameterPolicy>),
            [_, _] => Err("the minimum must not exceed the maximum".to_string()),
            _ => Err("expected two arguments".to_string()),
        });
        map.register("regex", |args| {
            let pattern = args.ok_or_else(|| "expected a regular expression".to_string())?;
            let constraint = RegexConstraint::new(pattern).map_err(|e| e.to_string())?;
            Ok(Arc::new(constraint))
        });
        map
    }

    /// Register (or replace) a constructor for `name`.
    pub fn register<F>(&mut self, name: &str, constructor: F)
    where
        F: Fn(Option<&str>) -> Result<Arc<dyn ParameterPolicy>, String> + Send + Sync + 'static,
    {
        self.entries
            .insert(name.to_ascii_lowercase(), Arc::new(constructor));
    }

    /// Register an argument-less policy.
    pub fn register_simple<P, F>(&mut self, name: &str, make: F)
    where
        P: ParameterPolicy + 'static,
        F: Fn() -> P + Send + Sync + 'static,
    {
        let label = name.to_string();
        self.register(name, move |args| match args {
            None => Ok(Arc::new(make()) as Arc<dyn ParameterPolicy>),
            Some(_) => Err(format!("'{label}' does not take arguments")),
        });
    }

    /// Register `name` as a shorthand for `regex(pattern)`.
    pub fn register_regex_alias(&mut self, name: &str, pattern: &str) -> Result<(), PolicyError> {
        let constraint = RegexConstraint::new(pattern).map_err(|e| PolicyError::InvalidArguments {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        let shared: Arc<dyn ParameterPolicy> = Arc::new(constraint);
        self.register(name, move |_| Ok(Arc::clone(&shared)));
        Ok(())
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_ascii_lowercase())
    }

    fn get(&self, name: &str) -> Option<&PolicyConstructor> {
        self.entries.get(&name.to_ascii_lowercase())
    }
}

impl Default for ConstraintMap {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for ConstraintMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("ConstraintMap").field("names", &names).finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ParameterPolicyFactory {
    map: ConstraintMap,
}

impl ParameterPolicyFactory {
    #[must_use]
    pub fn new(map: ConstraintMap) -> Self {
        Self { map }
    }

    #[must_use]
    pub fn constraint_map(&self) -> &ConstraintMap {
        &self.map
    }

    /// Resolve `reference` for the route value `key`. `parameter` is the
    /// pattern parameter of that name, absent when the key only names a
    /// default value.
    ///
    /// Named references must resolve to a policy with a match capability.
    /// Instances are returned as they are. Results for optional parameters
    /// are wrapped in [`OptionalConstraint`].
    pub fn create(
        &self,
        key: &str,
        parameter: Option<&ParameterPart>,
        reference: &PolicyReference,
    ) -> Result<Arc<dyn ParameterPolicy>, PolicyError> {
        let policy = match reference {
            PolicyReference::Instance(policy) => Arc::clone(policy),
            PolicyReference::Content(content) => {
                let (name, args) = split_reference(content);
                let constructor = self.map.get(name).ok_or_else(|| PolicyError::UnknownName {
                    name: name.to_string(),
                    parameter: key.to_string(),
                })?;
                let policy = constructor(args).map_err(|reason| PolicyError::InvalidArguments {
                    name: name.to_string(),
                    reason,
                })?;
                if policy.as_constraint().is_none() {
                    return Err(PolicyError::MissingCapability {
                        name: name.to_string(),
                        parameter: key.to_string(),
                    });
                }
                policy
            }
        };

        if parameter.is_some_and(ParameterPart::is_optional) && policy.as_constraint().is_some() {
            return Ok(Arc::new(OptionalConstraint::new(policy)));
        }
        Ok(policy)
    }
}

/// Split `name(args)` into its name and argument text.
fn split_reference(content: &str) -> (&str, Option<&str>) {
    match content.find('(') {
        Some(open) if content.ends_with(')') => {
            (&content[..open], Some(&content[open + 1..content.len() - 1]))
        }
        _ => (content, None),
    }
}

fn parse_args<T: std::str::FromStr>(name: &str, args: Option<&str>) -> Result<Vec<T>, String> {
    let args = args.ok_or_else(|| format!("'{name}' requires arguments"))?;
    args.split(',')
        .map(|a| {
            a.trim()
                .parse()
                .map_err(|_| format!("'{}' is not a valid argument", a.trim()))
        })
        .collect()
}

fn single<T: std::str::FromStr>(name: &str, args: Option<&str>) -> Result<[T; 1], String> {
    let mut values = parse_args::<T>(name, args)?;
    match values.pop() {
        Some(value) if values.is_empty() => Ok([value]),
        _ => Err("expected one argument".to_string()),
    }
}
