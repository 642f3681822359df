//! `waypoint match` — resolve one request against an endpoint file.
//!
//! Builds a matcher from the file exactly as `waypoint run` does, runs a
//! single request through it and prints the outcome. Nothing is served.

use std::sync::Arc;

use crate::cli::MatchArgs;
use crate::config::load_file;
use crate::config::model::Config;
use crate::dispatch::{MatchOutcome, MatchReport};
use crate::error::{MatcherError, WaypointError};
use crate::routing::matching::{builtin_policies, DfaMatcher, DfaMatcherBuilder, MatchContext};

pub async fn execute(args: &MatchArgs) -> Result<(), WaypointError> {
    let config = load_file(&args.config)?;
    let matcher = build_matcher(&config)?;

    let mut ctx = MatchContext::new(args.path.as_str()).with_method(args.method.to_ascii_uppercase());
    ctx.host.clone_from(&args.host);
    ctx.content_type.clone_from(&args.content_type);

    let result = matcher.match_request(&mut ctx).await;
    let outcome = MatchOutcome::from_result(result, ctx)?;
    let report = outcome.report();

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).unwrap_or_else(|_| "{}".to_string())
        );
    } else {
        print_report(args, &report);
    }
    Ok(())
}

pub fn build_matcher(config: &Config) -> Result<DfaMatcher, WaypointError> {
    let factory = config.policy_factory().map_err(|e| MatcherError::Policy {
        endpoint: "(root)".into(),
        source: e,
    })?;
    let mut builder = DfaMatcherBuilder::new(Arc::new(factory), builtin_policies());
    builder.add_endpoints(config.to_endpoints()?.into_iter().map(Arc::new));
    Ok(builder.build()?)
}

fn print_report(args: &MatchArgs, report: &MatchReport) {
    let request = format!("{} {}", args.method.to_ascii_uppercase(), args.path);
    let Some(ref endpoint) = report.endpoint else {
        let reason = report.error.as_deref().unwrap_or("no match");
        println!("\u{2717} {request}: {} {reason}", report.status);
        if !report.allow.is_empty() {
            println!("  allow: {}", report.allow.join(", "));
        }
        return;
    };

    println!("\u{2713} {request} -> {endpoint}");
    if let Some(ref template) = report.template {
        println!("  template: {template}");
    }
    if let Some(ref target) = report.target {
        println!("  target:   {target}");
    }
    if let Some(order) = report.order {
        println!("  order:    {order}");
    }
    for (key, value) in &report.values {
        println!("  {key} = {value}");
    }
}
