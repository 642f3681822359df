//! Route template parser.
//!
//! Grammar: `/`-separated segments, each a sequence of literal text and
//! `{parameter}` parts. A parameter is written
//! `{[*|**]name[:policy[(args)]]...[=default][?]}`. Braces inside literals
//! and parameters are escaped by doubling them. A leading `/` or `~/` and a
//! trailing `/` are ignored.

use crate::error::{PatternError, PatternErrorKind};
use crate::routing::values::RouteValueDictionary;

use super::{ParameterKind, ParameterPart, PathSegment, PathSegmentPart, PolicyReference, RoutePattern};

pub(super) fn parse(
    template: &str,
    defaults: &RouteValueDictionary,
    policies: Vec<(String, Vec<PolicyReference>)>,
) -> Result<RoutePattern, PatternError> {
    let err = |kind| PatternError::new(template, kind);

    let body = if let Some(rest) = template.strip_prefix("~/") {
        rest
    } else if let Some(rest) = template.strip_prefix('/') {
        rest
    } else if template.starts_with('~') {
        return Err(err(PatternErrorKind::InvalidTilde));
    } else {
        template
    };

    let mut segments = Scanner::new(body).segments().map_err(err)?;
    for segment in &mut segments {
        validate_segment(segment).map_err(err)?;
    }
    validate_template(&segments).map_err(err)?;

    let (segments, defaults, policies) = merge_out_of_line(segments, defaults, policies).map_err(err)?;
    Ok(RoutePattern::from_parts(
        template.to_string(),
        segments,
        defaults,
        policies,
    ))
}

struct Scanner {
    chars: Vec<char>,
    pos: usize,
}

impl Scanner {
    fn new(src: &str) -> Self {
        Self {
            chars: src.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn segments(&mut self) -> Result<Vec<PathSegment>, PatternErrorKind> {
        let mut segments = Vec::new();
        if self.chars.is_empty() {
            return Ok(segments);
        }
        loop {
            if self.peek() == Some('/') {
                return Err(PatternErrorKind::ConsecutiveSeparators);
            }
            segments.push(self.segment()?);
            match self.peek() {
                // Segment parsing stops only at '/' or the end.
                Some(_) => {
                    self.pos += 1;
                    if self.peek().is_none() {
                        break;
                    }
                }
                None => break,
            }
        }
        Ok(segments)
    }

    fn segment(&mut self) -> Result<PathSegment, PatternErrorKind> {
        let mut parts = Vec::new();
        loop {
            match (self.peek(), self.peek_at(1)) {
                (None | Some('/'), _) => break,
                (Some('{'), Some('{')) | (Some('}'), Some('}')) => parts.push(self.literal()?),
                (Some('{'), _) => parts.push(self.parameter()?),
                (Some('}'), _) => return Err(PatternErrorKind::IncompleteParameter),
                _ => parts.push(self.literal()?),
            }
        }
        Ok(PathSegment { parts })
    }

    fn literal(&mut self) -> Result<PathSegmentPart, PatternErrorKind> {
        let mut text = String::new();
        loop {
            match (self.peek(), self.peek_at(1)) {
                (None | Some('/'), _) => break,
                (Some('{'), Some('{')) => {
                    text.push('{');
                    self.pos += 2;
                }
                (Some('}'), Some('}')) => {
                    text.push('}');
                    self.pos += 2;
                }
                (Some('{'), _) => break,
                (Some('}'), _) => return Err(PatternErrorKind::IncompleteParameter),
                (Some(c), _) => {
                    text.push(c);
                    self.pos += 1;
                }
            }
        }
        if text.contains('?') {
            return Err(PatternErrorKind::InvalidLiteral(text));
        }
        Ok(PathSegmentPart::Literal(text))
    }

    /// Reads `{...}` with `{{`/`}}` unescaped; the slash is not special here
    /// because regex arguments may contain it.
    fn parameter(&mut self) -> Result<PathSegmentPart, PatternErrorKind> {
        self.pos += 1;
        let mut text = String::new();
        loop {
            match (self.peek(), self.peek_at(1)) {
                (None, _) => return Err(PatternErrorKind::IncompleteParameter),
                (Some('{'), Some('{')) => {
                    text.push('{');
                    self.pos += 2;
                }
                (Some('}'), Some('}')) => {
                    text.push('}');
                    self.pos += 2;
                }
                (Some('{'), _) => return Err(PatternErrorKind::UnescapedBrace),
                (Some('}'), _) => {
                    self.pos += 1;
                    break;
                }
                (Some(c), _) => {
                    text.push(c);
                    self.pos += 1;
                }
            }
        }
        parse_parameter(&text).map(PathSegmentPart::Parameter)
    }
}

/// Parses the inside of `{...}` once braces have been unescaped.
fn parse_parameter(text: &str) -> Result<ParameterPart, PatternErrorKind> {
    let chars: Vec<char> = text.chars().collect();
    let mut start = 0;
    let mut end = chars.len();
    let mut catch_all = false;
    let mut encode_slashes = true;

    if text.starts_with("**") {
        catch_all = true;
        encode_slashes = false;
        start = 2;
    } else if text.starts_with('*') {
        catch_all = true;
        start = 1;
    }

    let optional = end > start && chars[end - 1] == '?';
    if optional {
        end -= 1;
    }

    let mut idx = start;
    while idx < end && chars[idx] != ':' && chars[idx] != '=' {
        idx += 1;
    }
    let name: String = chars[start..idx].iter().collect();

    let mut policies = Vec::new();
    while idx < end && chars[idx] == ':' {
        let policy_start = idx + 1;
        idx = policy_start;
        let mut in_args = false;
        while idx < end {
            let c = chars[idx];
            if in_args {
                // ')' closes the argument list only when followed by a delimiter.
                if c == ')' && (idx + 1 == end || matches!(chars[idx + 1], ':' | '=')) {
                    in_args = false;
                }
            } else if c == '(' {
                in_args = true;
            } else if c == ':' || c == '=' {
                break;
            }
            idx += 1;
        }
        let content: String = chars[policy_start..idx].iter().collect();
        if content.is_empty() {
            return Err(PatternErrorKind::EmptyConstraint(name));
        }
        policies.push(PolicyReference::Content(content));
    }

    let default = if idx < end && chars[idx] == '=' {
        Some(chars[idx + 1..end].iter().collect::<String>())
    } else {
        None
    };

    if !is_valid_parameter_name(&name) {
        return Err(PatternErrorKind::InvalidParameterName(name));
    }
    if catch_all && optional {
        return Err(PatternErrorKind::OptionalCatchAll);
    }
    if optional && default.is_some() {
        return Err(PatternErrorKind::OptionalWithDefault(name));
    }

    let kind = if catch_all {
        ParameterKind::CatchAll
    } else if optional {
        ParameterKind::Optional
    } else {
        ParameterKind::Standard
    };

    Ok(ParameterPart {
        name,
        default,
        kind,
        encode_slashes,
        policies,
    })
}

fn is_valid_parameter_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(['{', '}', '/', '?', '*'])
}

fn validate_segment(segment: &mut PathSegment) -> Result<(), PatternErrorKind> {
    let count = segment.parts.len();
    if count > 1
        && segment
            .parts
            .iter()
            .any(|p| p.as_parameter().is_some_and(ParameterPart::is_catch_all))
    {
        return Err(PatternErrorKind::CatchAllInComplexSegment);
    }

    if count > 1 {
        let rendered = segment.to_string();
        for i in 0..count {
            let Some(parameter) = segment.parts[i].as_parameter() else {
                continue;
            };
            if !parameter.is_optional() {
                continue;
            }
            if i + 1 < count {
                return Err(PatternErrorKind::OptionalNotLast {
                    segment: rendered,
                    parameter: parameter.name.clone(),
                    following: segment.parts[i + 1].to_string(),
                });
            }
            let parameter = parameter.name.clone();
            let after_period =
                matches!(&segment.parts[i - 1], PathSegmentPart::Literal(text) if text == ".");
            if !after_period {
                return Err(PatternErrorKind::OptionalNotAfterPeriod {
                    segment: rendered,
                    parameter,
                    preceding: segment.parts[i - 1].to_string(),
                });
            }
            segment.parts[i - 1] = PathSegmentPart::Separator(".".into());
        }
    }

    if segment
        .parts
        .windows(2)
        .any(|w| w[0].is_parameter() && w[1].is_parameter())
    {
        return Err(PatternErrorKind::ConsecutiveParameters);
    }
    Ok(())
}

fn validate_template(segments: &[PathSegment]) -> Result<(), PatternErrorKind> {
    let mut seen: Vec<&str> = Vec::new();
    for (i, segment) in segments.iter().enumerate() {
        for parameter in segment.parts.iter().filter_map(PathSegmentPart::as_parameter) {
            if seen.iter().any(|s| s.eq_ignore_ascii_case(&parameter.name)) {
                return Err(PatternErrorKind::RepeatedParameter(parameter.name.clone()));
            }
            seen.push(&parameter.name);
        }
        if segment.is_catch_all() && i + 1 != segments.len() {
            return Err(PatternErrorKind::CatchAllNotLast);
        }
    }
    Ok(())
}

type Merged = (
    Vec<PathSegment>,
    RouteValueDictionary,
    Vec<(String, Vec<PolicyReference>)>,
);

fn merge_out_of_line(
    mut segments: Vec<PathSegment>,
    defaults: &RouteValueDictionary,
    policies: Vec<(String, Vec<PolicyReference>)>,
) -> Result<Merged, PatternErrorKind> {
    let mut merged_defaults = defaults.clone();
    let mut merged_policies: Vec<(String, Vec<PolicyReference>)> = Vec::new();

    for part in segments.iter_mut().flat_map(|s| s.parts.iter_mut()) {
        let PathSegmentPart::Parameter(parameter) = part else {
            continue;
        };

        if let Some(value) = defaults.get(&parameter.name) {
            if parameter.default.as_deref().is_some_and(|d| d != value) {
                return Err(PatternErrorKind::ConflictingDefault(parameter.name.clone()));
            }
            if parameter.is_optional() {
                return Err(PatternErrorKind::OptionalWithDefault(parameter.name.clone()));
            }
            parameter.default = Some(value.to_string());
        }
        if let Some(ref default) = parameter.default {
            merged_defaults.insert(parameter.name.clone(), default.clone());
        }

        if let Some((_, extra)) = policies
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(&parameter.name))
        {
            parameter.policies.extend(extra.iter().cloned());
        }
        if !parameter.policies.is_empty() {
            merged_policies.push((parameter.name.clone(), parameter.policies.clone()));
        }
    }

    // Policies for keys that are not parameters still constrain defaults.
    for (name, references) in policies {
        if !merged_policies
            .iter()
            .any(|(n, _)| n.eq_ignore_ascii_case(&name))
        {
            merged_policies.push((name, references));
        }
    }

    Ok((segments, merged_defaults, merged_policies))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(template: &str) -> RoutePattern {
        RoutePattern::parse(template).unwrap()
    }

    fn kind(template: &str) -> PatternErrorKind {
        RoutePattern::parse(template).unwrap_err().kind
    }

    fn parameter(pattern: &RoutePattern, segment: usize, part: usize) -> &ParameterPart {
        pattern.path_segments()[segment].parts[part]
            .as_parameter()
            .unwrap()
    }

    #[test]
    fn single_literal() {
        let pattern = parse("cool");
        assert_eq!(pattern.path_segments().len(), 1);
        assert_eq!(pattern.path_segments()[0].as_literal(), Some("cool"));
        assert!(pattern.parameters().is_empty());
    }

    #[test]
    fn empty_and_root_templates_have_no_segments() {
        assert!(parse("").path_segments().is_empty());
        assert!(parse("/").path_segments().is_empty());
        assert!(parse("~/").path_segments().is_empty());
    }

    #[test]
    fn leading_slash_and_tilde_slash_are_stripped() {
        assert_eq!(parse("/foo"), parse("foo"));
        assert_eq!(parse("~/foo"), parse("foo"));
        assert_eq!(parse("~/foo").raw_text(), "~/foo");
    }

    #[test]
    fn trailing_slash_is_ignored() {
        assert_eq!(parse("a/b/"), parse("a/b"));
    }

    #[test]
    fn parameter_with_default_constraints_and_optional() {
        let pattern = parse("{p1=hello}/{p2:int:min(1)}/{p3?}");
        let p1 = parameter(&pattern, 0, 0);
        assert_eq!(p1.default.as_deref(), Some("hello"));
        assert_eq!(p1.kind, ParameterKind::Standard);

        let p2 = parameter(&pattern, 1, 0);
        assert_eq!(
            p2.policies,
            vec![
                PolicyReference::content("int"),
                PolicyReference::content("min(1)")
            ]
        );

        let p3 = parameter(&pattern, 2, 0);
        assert_eq!(p3.kind, ParameterKind::Optional);
        assert_eq!(pattern.defaults().get("p1"), Some("hello"));
    }

    #[test]
    fn catch_all_variants() {
        let pattern = parse("files/{*path}");
        let path = parameter(&pattern, 1, 0);
        assert!(path.is_catch_all());
        assert!(path.encode_slashes);

        let pattern = parse("files/{**path}");
        assert!(!parameter(&pattern, 1, 0).encode_slashes);
        assert!(pattern.ends_with_catch_all());
    }

    #[test]
    fn complex_segments() {
        let pattern = parse("{p1}-{p2}.{p3?}");
        let parts = &pattern.path_segments()[0].parts;
        assert_eq!(parts.len(), 5);
        assert_eq!(parts[1], PathSegmentPart::Literal("-".into()));
        assert_eq!(parts[3], PathSegmentPart::Separator(".".into()));
        assert_eq!(pattern.parameters().len(), 3);
    }

    #[test]
    fn regex_constraints_keep_escaped_braces() {
        let pattern = parse(r"{p1:regex(^\d{{3}}-\d{{3}}-\d{{4}}$)}");
        assert_eq!(
            parameter(&pattern, 0, 0).policies,
            vec![PolicyReference::content(r"regex(^\d{3}-\d{3}-\d{4}$)")]
        );

        let pattern = parse(r"{p1:regex(^\d{{1,2}}\/\d{{1,2}}\/\d{{4}}$)}");
        assert_eq!(
            parameter(&pattern, 0, 0).policies,
            vec![PolicyReference::content(r"regex(^\d{1,2}\/\d{1,2}\/\d{4}$)")]
        );
    }

    #[test]
    fn regex_argument_may_contain_colons() {
        let pattern = parse("{p:regex(^(?:a|b)$):minlength(1)}");
        assert_eq!(
            parameter(&pattern, 0, 0).policies,
            vec![
                PolicyReference::content("regex(^(?:a|b)$)"),
                PolicyReference::content("minlength(1)")
            ]
        );
    }

    #[test]
    fn constraint_followed_by_default() {
        let pattern = parse("{id:int=5}");
        let id = parameter(&pattern, 0, 0);
        assert_eq!(id.policies, vec![PolicyReference::content("int")]);
        assert_eq!(id.default.as_deref(), Some("5"));
    }

    #[test]
    fn mismatched_braces_are_rejected() {
        for template in ["123{a}abc{", "123{a}abc}", "xyz}123{a}abc}", "{{p1}", "{p1}}", "p1}}p2{"] {
            assert!(
                matches!(
                    kind(template),
                    PatternErrorKind::IncompleteParameter | PatternErrorKind::UnescapedBrace
                ),
                "{template}"
            );
        }
        assert_eq!(kind("foo/{{p1}"), PatternErrorKind::IncompleteParameter);
        assert_eq!(kind("foo/{p1}}"), PatternErrorKind::IncompleteParameter);
        assert_eq!(kind("{a}/{aa}a}/{z}"), PatternErrorKind::IncompleteParameter);
        assert_eq!(kind("{a}/{a{aa}/{z}"), PatternErrorKind::UnescapedBrace);
    }

    #[test]
    fn invalid_parameter_names() {
        for (template, name) in [
            ("{a*}", "a*"),
            ("{*a*}", "a*"),
            ("{*a*:int}", "a*"),
            ("{*a*=5}", "a*"),
            ("{p{{}", "p{"),
            ("{p}}}", "p}"),
            ("{p/}", "p/"),
            ("{a}/{}/{z}", ""),
            ("foo/{*}", ""),
            ("{Controller}.mvc/{?}", ""),
            ("{foor?b}", "foor?b"),
        ] {
            assert_eq!(
                kind(template),
                PatternErrorKind::InvalidParameterName(name.into()),
                "{template}"
            );
        }
    }

    #[test]
    fn duplicate_parameters_are_case_insensitive() {
        assert_eq!(
            kind("{aaa}/{AAA}"),
            PatternErrorKind::RepeatedParameter("AAA".into())
        );
        assert_eq!(
            kind("{aaa}/{*AAA}"),
            PatternErrorKind::RepeatedParameter("AAA".into())
        );
    }

    #[test]
    fn catch_all_rules() {
        assert_eq!(kind("{*p1}/{*p2}"), PatternErrorKind::CatchAllNotLast);
        assert_eq!(kind("foo/{p1}/{*p2}/{p3}"), PatternErrorKind::CatchAllNotLast);
        assert_eq!(kind("123{a}abc{*moo}"), PatternErrorKind::CatchAllInComplexSegment);
        assert_eq!(kind("{*p1}abc{*p2}"), PatternErrorKind::CatchAllInComplexSegment);
        assert_eq!(kind("{a}/{*b?}"), PatternErrorKind::OptionalCatchAll);
    }

    #[test]
    fn structural_errors() {
        assert_eq!(kind("{a}//{z}"), PatternErrorKind::ConsecutiveSeparators);
        assert_eq!(kind("foo/aa{p1}{p2}"), PatternErrorKind::ConsecutiveParameters);
        assert_eq!(kind("~foo"), PatternErrorKind::InvalidTilde);
        assert_eq!(
            kind("foor?bar"),
            PatternErrorKind::InvalidLiteral("foor?bar".into())
        );
        assert_eq!(
            kind("{a=b?}"),
            PatternErrorKind::OptionalWithDefault("a".into())
        );
    }

    #[test]
    fn optional_parameter_position_in_complex_segment() {
        assert!(matches!(
            kind("{p1}.{p2?}.{p3}"),
            PatternErrorKind::OptionalNotLast { ref following, .. } if following == "."
        ));
        assert!(matches!(
            kind("{p1?}{p2}"),
            PatternErrorKind::OptionalNotLast { ref following, .. } if following == "{p2}"
        ));
        assert!(matches!(
            kind("{p1}-{p2?}"),
            PatternErrorKind::OptionalNotAfterPeriod { ref preceding, .. } if preceding == "-"
        ));
        assert!(matches!(
            kind("{p1}..{p2?}"),
            PatternErrorKind::OptionalNotAfterPeriod { ref preceding, .. } if preceding == ".."
        ));
    }

    #[test]
    fn out_of_line_defaults_are_merged() {
        let defaults: RouteValueDictionary = [("a", "aa"), ("d", "dd")].into_iter().collect();
        let pattern = RoutePattern::parse_with("{a}/{b}/{c=cc}", &defaults, Vec::new()).unwrap();
        assert_eq!(parameter(&pattern, 0, 0).default.as_deref(), Some("aa"));
        assert_eq!(pattern.defaults().get("d"), Some("dd"));
        assert_eq!(pattern.defaults().get("c"), Some("cc"));
    }

    #[test]
    fn conflicting_defaults_are_rejected() {
        let defaults: RouteValueDictionary = [("a", "other")].into_iter().collect();
        let err = RoutePattern::parse_with("{a=aa}", &defaults, Vec::new()).unwrap_err();
        assert_eq!(err.kind, PatternErrorKind::ConflictingDefault("a".into()));

        let err = RoutePattern::parse_with("{a?}", &defaults, Vec::new()).unwrap_err();
        assert_eq!(err.kind, PatternErrorKind::OptionalWithDefault("a".into()));
    }

    #[test]
    fn out_of_line_policies_are_appended() {
        let pattern = RoutePattern::parse_with(
            "{id:int}",
            &RouteValueDictionary::new(),
            vec![
                ("ID".to_string(), vec![PolicyReference::content("min(1)")]),
                ("other".to_string(), vec![PolicyReference::regex("^x$")]),
            ],
        )
        .unwrap();
        assert_eq!(
            parameter(&pattern, 0, 0).policies,
            vec![
                PolicyReference::content("int"),
                PolicyReference::content("min(1)")
            ]
        );
        assert_eq!(pattern.parameter_policies().len(), 2);
        assert_eq!(pattern.parameter_policies()[1].0, "other");
    }

    #[test]
    fn parsing_is_idempotent_through_display() {
        for template in [
            "",
            "a/b/c",
            "api/{controller}/{action=Index}/{id:int:min(1)?}",
            "files/{*path}",
            "files/{**path}",
            "{p1}-{p2}.{p3?}",
            "literal{{braces}}/{x}",
            r"{p1:regex(^\d{{3}}$)}",
        ] {
            let pattern = parse(template);
            let rendered = pattern.to_string();
            assert_eq!(parse(&rendered), pattern, "{template} -> {rendered}");
            assert_eq!(parse(pattern.raw_text()), pattern);
        }
    }
}
