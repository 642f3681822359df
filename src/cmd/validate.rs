//! `waypoint validate` — check an endpoint file for errors.
//!
//! Parses and validates the file, reporting results in either
//! human-readable text or machine-readable JSON format.

use crate::cli::{ValidateArgs, ValidateFormat};
use crate::config::{read_file, validation};
use crate::error::WaypointError;

pub fn execute(args: &ValidateArgs) -> Result<(), WaypointError> {
    let path = &args.config;
    let config = read_file(path)?;

    if let Err(errors) = validation::validate(&config) {
        match args.format {
            ValidateFormat::Text => {
                eprintln!("\u{2717} {} has {} errors\n", path.display(), errors.len());
                for error in &errors {
                    eprintln!("{error}");
                }
            }
            ValidateFormat::Json => {
                let json_errors: Vec<serde_json::Value> = errors
                    .iter()
                    .map(|e| {
                        serde_json::json!({
                            "endpoint": e.endpoint,
                            "field": e.field,
                            "message": e.message,
                            "suggestion": e.suggestion,
                        })
                    })
                    .collect();
                println!(
                    "{}",
                    serde_json::json!({
                        "valid": false,
                        "errors": json_errors,
                    })
                );
            }
        }
        return Err(WaypointError::ConfigValidation { errors });
    }

    match args.format {
        ValidateFormat::Text => {
            println!(
                "\u{2713} {}",
                validation::format_validation_report(&path.display().to_string(), &config)
            );
        }
        ValidateFormat::Json => {
            let suppressed = config.endpoints.iter().filter(|e| e.suppress_matching).count();
            println!(
                "{}",
                serde_json::json!({
                    "valid": true,
                    "endpoints": config.endpoints.len(),
                    "suppressed": suppressed,
                    "constraints": config.constraints.keys().collect::<Vec<_>>(),
                })
            );
        }
    }

    Ok(())
}
