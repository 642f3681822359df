//! The HTTP face of the matcher.
//!
//! [`match_handler`] is the Axum fallback that receives every non-`/health`
//! request, resolves it with the current matcher and answers with a JSON
//! [`MatchReport`]. [`MatchOutcome`] classifies a finished match, including
//! the synthesized 405 and 415 endpoints, and is shared with
//! `waypoint match`.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::extract::{ConnectInfo, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};

use crate::error::{AmbiguousMatchError, MatchError};
use crate::routing::endpoint::Endpoint;
use crate::routing::matching::{MatchContext, MethodNotAllowed, UnsupportedMediaType};
use crate::routing::values::RouteValueDictionary;
use crate::server::AppState;

pub const CORRELATION_ID: &str = "x-correlation-id";

#[derive(Debug)]
pub enum MatchOutcome {
    Matched {
        endpoint: Arc<Endpoint>,
        values: RouteValueDictionary,
    },
    NotFound,
    MethodNotAllowed {
        allowed: Vec<String>,
    },
    UnsupportedMediaType,
    Ambiguous(AmbiguousMatchError),
}

impl MatchOutcome {
    /// Classify the result of a match and the context it left behind.
    ///
    /// Ambiguity becomes an outcome; any other match error is returned.
    pub fn from_result(result: Result<(), MatchError>, ctx: MatchContext) -> Result<Self, MatchError> {
        match result {
            Ok(()) => {}
            Err(MatchError::Ambiguous(e)) => return Ok(Self::Ambiguous(e)),
            Err(e) => return Err(e),
        }

        let Some(endpoint) = ctx.endpoint else {
            return Ok(Self::NotFound);
        };
        if let Some(rejection) = endpoint.metadata().get_metadata::<MethodNotAllowed>() {
            return Ok(Self::MethodNotAllowed {
                allowed: rejection.allowed_methods.clone(),
            });
        }
        if endpoint.metadata().contains::<UnsupportedMediaType>() {
            return Ok(Self::UnsupportedMediaType);
        }
        Ok(Self::Matched {
            endpoint,
            values: ctx.route_values,
        })
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Matched { .. } => StatusCode::OK,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Self::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Ambiguous(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[must_use]
    pub fn report(&self) -> MatchReport {
        let mut report = MatchReport {
            status: self.status().as_u16(),
            ..MatchReport::default()
        };
        match self {
            Self::Matched { endpoint, values } => {
                report.endpoint = Some(endpoint.display_name().to_string());
                report.template = Some(endpoint.route_pattern().raw_text().to_string());
                report.target = endpoint.target().map(String::from);
                report.order = Some(endpoint.order());
                report.values = values
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect();
            }
            Self::NotFound => report.error = Some("no endpoint matched the request".into()),
            Self::MethodNotAllowed { allowed } => {
                report.allow.clone_from(allowed);
                report.error = Some("method not allowed".into());
            }
            Self::UnsupportedMediaType => report.error = Some("unsupported media type".into()),
            Self::Ambiguous(e) => report.error = Some(e.to_string()),
        }
        report
    }
}

/// JSON body of every matcher response.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchReport {
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub values: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allow: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn header_str(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}

/// Percent-decode a request path, leaving encoded slashes (`%2F`) as they
/// are so they never split a segment.
pub fn decode_path(raw: &str) -> Result<String, std::str::Utf8Error> {
    let mut decoded = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(i) = rest
        .as_bytes()
        .windows(3)
        .position(|w| w[0] == b'%' && w[1] == b'2' && w[2].eq_ignore_ascii_case(&b'f'))
    {
        decoded.push_str(&percent_decode_str(&rest[..i]).decode_utf8()?);
        decoded.push_str(&rest[i..i + 3]);
        rest = &rest[i + 3..];
    }
    decoded.push_str(&percent_decode_str(rest).decode_utf8()?);
    Ok(decoded)
}

pub async fn match_handler(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let correlation_id = headers
        .get(CORRELATION_ID)
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| uuid::Uuid::new_v4().to_string(), String::from);

    let path = match decode_path(uri.path()) {
        Ok(path) => path,
        Err(e) => {
            tracing::warn!(
                correlation_id = %correlation_id,
                method = %method,
                path = %uri.path(),
                error = %e,
                "request path is not valid UTF-8"
            );
            return respond(
                StatusCode::BAD_REQUEST,
                &MatchReport {
                    status: StatusCode::BAD_REQUEST.as_u16(),
                    error: Some(format!("request path is not valid UTF-8: {e}")),
                    ..MatchReport::default()
                },
                &correlation_id,
            );
        }
    };

    let mut ctx = MatchContext::new(path.as_str()).with_method(method.as_str());
    ctx.host = header_str(&headers, header::HOST)
        .or_else(|| uri.authority().map(ToString::to_string));
    ctx.content_type = header_str(&headers, header::CONTENT_TYPE);

    let result = state.matcher.match_request(&mut ctx).await;
    let outcome = match MatchOutcome::from_result(result, ctx) {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(
                correlation_id = %correlation_id,
                method = %method,
                path = %path,
                error = %e,
                "match failed"
            );
            state.stats.failed.fetch_add(1, Ordering::Relaxed);
            return respond(
                StatusCode::INTERNAL_SERVER_ERROR,
                &MatchReport {
                    status: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
                    error: Some(e.to_string()),
                    ..MatchReport::default()
                },
                &correlation_id,
            );
        }
    };

    let counter = match &outcome {
        MatchOutcome::Matched { endpoint, .. } => {
            tracing::info!(
                correlation_id = %correlation_id,
                client = %addr.ip(),
                method = %method,
                path = %path,
                endpoint = %endpoint.display_name(),
                "request matched"
            );
            &state.stats.matched
        }
        MatchOutcome::NotFound => {
            tracing::warn!(
                correlation_id = %correlation_id,
                method = %method,
                path = %path,
                "no endpoint matched"
            );
            &state.stats.not_found
        }
        MatchOutcome::MethodNotAllowed { .. } | MatchOutcome::UnsupportedMediaType => {
            tracing::info!(
                correlation_id = %correlation_id,
                method = %method,
                path = %path,
                status = outcome.status().as_u16(),
                "request rejected"
            );
            &state.stats.rejected
        }
        MatchOutcome::Ambiguous(_) => &state.stats.ambiguous,
    };
    counter.fetch_add(1, Ordering::Relaxed);

    let mut response = respond(outcome.status(), &outcome.report(), &correlation_id);
    if let MatchOutcome::MethodNotAllowed { allowed } = &outcome {
        if let Ok(value) = HeaderValue::from_str(&allowed.join(", ")) {
            response.headers_mut().insert(header::ALLOW, value);
        }
    }
    response
}

fn respond(status: StatusCode, report: &MatchReport, correlation_id: &str) -> Response {
    let mut response = (status, Json(report)).into_response();
    if let Ok(value) = HeaderValue::from_str(correlation_id) {
        response.headers_mut().insert(CORRELATION_ID, value);
    }
    response
}
