//! `waypoint init` — generate a starter endpoint file.
//!
//! Creates a YAML, JSON, or TOML endpoint file with either a minimal or a
//! fully documented template.

use std::path::PathBuf;

use crate::cli::{ConfigFormat, InitArgs};
use crate::error::WaypointError;

pub fn execute(args: &InitArgs) -> Result<(), WaypointError> {
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("waypoint.{}", args.format.extension())));

    if output.exists() {
        return Err(WaypointError::FileExists { path: output });
    }

    std::fs::write(&output, template(&args.format, args.full))?;
    println!("Created {}", output.display());
    Ok(())
}

const fn template(format: &ConfigFormat, full: bool) -> &'static str {
    match (format, full) {
        (ConfigFormat::Yaml, false) => YAML_MINIMAL,
        (ConfigFormat::Yaml, true) => YAML_FULL,
        (ConfigFormat::Json, false) => JSON_MINIMAL,
        (ConfigFormat::Json, true) => JSON_FULL,
        (ConfigFormat::Toml, false) => TOML_MINIMAL,
        (ConfigFormat::Toml, true) => TOML_FULL,
    }
}

const YAML_MINIMAL: &str = r#"# Waypoint endpoint file

endpoints:
  - template: "/products/{id:int}"
    name: "product"
    target: "catalog"

  - template: "/files/{**path}"
    name: "files"
    target: "static"
"#;

const YAML_FULL: &str = r#"# Waypoint endpoint file
#
# Template syntax:
#   literal segment      /products
#   parameter            {id}
#   inline constraints   {id:int}  {name:alpha:minlength(2)}
#   optional parameter   {page?}
#   inline default       {format=json}
#   catch-all            {*path}  {**path}
#   complex segment      {name}.{ext}
#
# When several endpoints match, the lowest `order` wins, then the most
# specific template. Two equally ranked matches are reported as ambiguous.

# Values an endpoint inherits when it leaves them unset.
defaults:
  order: 0
  methods: ["*"]

# Named regular expressions usable as constraints, e.g. {slug:slug}.
constraints:
  slug: "^[a-z0-9-]+$"

endpoints:
  - template: "/products/{id:int}"
    name: "product"
    methods: ["GET"]
    target: "catalog"

  - template: "/products"
    name: "create-product"
    methods: ["POST"]
    accepts: ["application/json"]   # other content types get a 415
    # accepts_optional: true        # also accept requests without a body type
    target: "catalog"

  - template: "/blog/{post:slug}"
    name: "post"
    hosts: ["www.example.com", "*.example.com"]
    target: "blog"

  - template: "/reports/{year}/{month?}"
    name: "report"
    constraints:                    # out-of-line constraints per parameter
      year: ["int", "range(2000,2100)"]
    target: "reports"

  - template: "/docs/{page}"
    name: "docs"
    defaults:                       # out-of-line default values
      page: "index"
    target: "docs"

  - template: "/files/{**path}"
    name: "files"
    order: 10
    target: "static"

  # Kept in the file but never matched.
  # - template: "/internal/{*rest}"
  #   suppress_matching: true
"#;

const JSON_MINIMAL: &str = r#"{
  "endpoints": [
    { "template": "/products/{id:int}", "name": "product", "target": "catalog" },
    { "template": "/files/{**path}", "name": "files", "target": "static" }
  ]
}
"#;

const JSON_FULL: &str = r#"{
  "defaults": {
    "order": 0,
    "methods": ["*"]
  },
  "constraints": {
    "slug": "^[a-z0-9-]+$"
  },
  "endpoints": [
    {
      "template": "/products/{id:int}",
      "name": "product",
      "methods": ["GET"],
      "target": "catalog"
    },
    {
      "template": "/products",
      "name": "create-product",
      "methods": ["POST"],
      "accepts": ["application/json"],
      "target": "catalog"
    },
    {
      "template": "/blog/{post:slug}",
      "name": "post",
      "hosts": ["www.example.com", "*.example.com"],
      "target": "blog"
    },
    {
      "template": "/reports/{year}/{month?}",
      "name": "report",
      "constraints": { "year": ["int", "range(2000,2100)"] },
      "target": "reports"
    },
    {
      "template": "/docs/{page}",
      "name": "docs",
      "defaults": { "page": "index" },
      "target": "docs"
    },
    {
      "template": "/files/{**path}",
      "name": "files",
      "order": 10,
      "target": "static"
    }
  ]
}
"#;

const TOML_MINIMAL: &str = r#"# Waypoint endpoint file

[[endpoints]]
template = "/products/{id:int}"
name = "product"
target = "catalog"

[[endpoints]]
template = "/files/{**path}"
name = "files"
target = "static"
"#;

const TOML_FULL: &str = r#"# Waypoint endpoint file
#
# See `waypoint init --full` in YAML format for the template syntax.

# Values an endpoint inherits when it leaves them unset.
[defaults]
order = 0
methods = ["*"]

# Named regular expressions usable as constraints, e.g. {slug:slug}.
[constraints]
slug = "^[a-z0-9-]+$"

[[endpoints]]
template = "/products/{id:int}"
name = "product"
methods = ["GET"]
target = "catalog"

[[endpoints]]
template = "/products"
name = "create-product"
methods = ["POST"]
accepts = ["application/json"]
# accepts_optional = true
target = "catalog"

[[endpoints]]
template = "/blog/{post:slug}"
name = "post"
hosts = ["www.example.com", "*.example.com"]
target = "blog"

[[endpoints]]
template = "/reports/{year}/{month?}"
name = "report"
target = "reports"

[endpoints.constraints]
year = ["int", "range(2000,2100)"]

[[endpoints]]
template = "/docs/{page}"
name = "docs"
target = "docs"

[endpoints.defaults]
page = "index"

[[endpoints]]
template = "/files/{**path}"
name = "files"
order = 10
target = "static"
"#;
