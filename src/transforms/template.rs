//! Route template parsing and binding.
//!
//! # Responsibilities
//! - Parse template text into literal and placeholder segments
//! - Bind placeholders against the per-request route values
//!
//! # Design Decisions
//! - Literal text is kept verbatim (`#`, `%`, spaces...); templates are path
//!   data, nothing is percent-encoded or decoded on either side
//! - Parsing happens once at build time; binding is pure and runs per request
//! - A missing route value binds to the empty string. `BindPolicy::RequireAll`
//!   moves that check to build time instead of failing requests

use thiserror::Error;

use crate::transforms::state::RouteValues;

/// Template syntax errors, reported at build time only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("unclosed '{{' at position {position} in template '{template}'")]
    UnclosedBrace { template: String, position: usize },

    #[error("unmatched '}}' at position {position} in template '{template}'")]
    UnmatchedBrace { template: String, position: usize },

    #[error("empty parameter at position {position} in template '{template}'")]
    EmptyParameter { template: String, position: usize },

    #[error("invalid parameter '{name}' in template '{template}'")]
    InvalidParameterName { template: String, name: String },

    #[error("parameter '{name}' appears more than once in template '{template}'")]
    DuplicateParameter { template: String, name: String },

    #[error("catch-all parameter '{name}' must be the last segment of template '{template}'")]
    CatchAllNotLast { template: String, name: String },
}

/// A named placeholder: `{name}`, `{**name}`, `{name?}`, `{name=default}`,
/// `{name:constraint}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateParameter {
    name: String,
    catch_all: bool,
    optional: bool,
    default: Option<String>,
}

impl TemplateParameter {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_catch_all(&self) -> bool {
        self.catch_all
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn default_value(&self) -> Option<&str> {
        self.default.as_deref()
    }

    /// Whether binding needs a route value to produce the intended path.
    pub fn is_required(&self) -> bool {
        !self.catch_all && !self.optional && self.default.is_none()
    }

    fn parse(template: &str, inner: &str, position: usize) -> Result<Self, TemplateError> {
        if inner.is_empty() {
            return Err(TemplateError::EmptyParameter {
                template: template.to_string(),
                position,
            });
        }

        let (catch_all, rest) = if let Some(rest) = inner.strip_prefix("**") {
            (true, rest)
        } else if let Some(rest) = inner.strip_prefix('*') {
            (true, rest)
        } else {
            (false, inner)
        };

        let (head, default) = match rest.split_once('=') {
            Some((head, default)) => (head, Some(default.to_string())),
            None => (rest, None),
        };
        let (head, optional) = match head.strip_suffix('?') {
            Some(head) => (head, true),
            None => (head, false),
        };
        // Constraints only matter to route matching.
        let name = head.split_once(':').map_or(head, |(name, _)| name);

        if name.is_empty() || name.contains(['/', '*', '?', '=', '{', '}']) {
            return Err(TemplateError::InvalidParameterName {
                template: template.to_string(),
                name: inner.to_string(),
            });
        }

        Ok(Self {
            name: name.to_string(),
            catch_all,
            optional,
            default,
        })
    }
}

/// One piece of a parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSegment {
    Literal(String),
    Parameter(TemplateParameter),
}

/// A parsed, immutable route template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTemplate {
    text: String,
    segments: Vec<TemplateSegment>,
}

impl RouteTemplate {
    /// Parse `text`. `{{` and `}}` are literal braces.
    pub fn parse(text: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = text.char_indices().peekable();

        while let Some((i, c)) = chars.next() {
            match c {
                '{' if matches!(chars.peek(), Some((_, '{'))) => {
                    chars.next();
                    literal.push('{');
                }
                '{' => {
                    let close = text[i + 1..]
                        .find(['{', '}'])
                        .map(|offset| i + 1 + offset)
                        .filter(|&end| text.as_bytes()[end] == b'}')
                        .ok_or_else(|| TemplateError::UnclosedBrace {
                            template: text.to_string(),
                            position: i,
                        })?;

                    if !literal.is_empty() {
                        segments.push(TemplateSegment::Literal(std::mem::take(&mut literal)));
                    }
                    let parameter = TemplateParameter::parse(text, &text[i + 1..close], i)?;
                    segments.push(TemplateSegment::Parameter(parameter));

                    while chars.next_if(|&(j, _)| j <= close).is_some() {}
                }
                '}' if matches!(chars.peek(), Some((_, '}'))) => {
                    chars.next();
                    literal.push('}');
                }
                '}' => {
                    return Err(TemplateError::UnmatchedBrace {
                        template: text.to_string(),
                        position: i,
                    });
                }
                _ => literal.push(c),
            }
        }
        if !literal.is_empty() {
            segments.push(TemplateSegment::Literal(literal));
        }

        let template = Self {
            text: text.to_string(),
            segments,
        };
        template.check_parameters()?;
        Ok(template)
    }

    fn check_parameters(&self) -> Result<(), TemplateError> {
        let mut seen: Vec<&str> = Vec::new();
        let last = self.segments.len().saturating_sub(1);

        for (index, segment) in self.segments.iter().enumerate() {
            let TemplateSegment::Parameter(parameter) = segment else {
                continue;
            };
            if seen.iter().any(|name| name.eq_ignore_ascii_case(&parameter.name)) {
                return Err(TemplateError::DuplicateParameter {
                    template: self.text.clone(),
                    name: parameter.name.clone(),
                });
            }
            if parameter.catch_all && index != last {
                return Err(TemplateError::CatchAllNotLast {
                    template: self.text.clone(),
                    name: parameter.name.clone(),
                });
            }
            seen.push(&parameter.name);
        }
        Ok(())
    }

    /// The original template text.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn segments(&self) -> &[TemplateSegment] {
        &self.segments
    }

    pub fn parameters(&self) -> impl Iterator<Item = &TemplateParameter> {
        self.segments.iter().filter_map(|segment| match segment {
            TemplateSegment::Parameter(parameter) => Some(parameter),
            TemplateSegment::Literal(_) => None,
        })
    }

    /// Sum of literal lengths, a lower bound for the bound output.
    fn literal_len(&self) -> usize {
        self.segments
            .iter()
            .map(|segment| match segment {
                TemplateSegment::Literal(text) => text.len(),
                TemplateSegment::Parameter(_) => 0,
            })
            .sum()
    }
}

/// How unresolved placeholders are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BindPolicy {
    /// Missing values bind to the empty string.
    #[default]
    Lenient,
    /// Required placeholders must be provided by the route pattern; checked
    /// when the transform is built.
    RequireAll,
}

/// Stateless binding service, created once and shared by every route.
#[derive(Debug, Clone, Default)]
pub struct TemplateBinder {
    policy: BindPolicy,
}

impl TemplateBinder {
    pub fn new(policy: BindPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> BindPolicy {
        self.policy
    }

    /// Substitute every placeholder of `template` from `values`.
    pub fn bind(&self, template: &RouteTemplate, values: &RouteValues) -> String {
        let mut out = String::with_capacity(template.literal_len() + values.value_len());
        for segment in &template.segments {
            match segment {
                TemplateSegment::Literal(text) => out.push_str(text),
                TemplateSegment::Parameter(parameter) => {
                    if let Some(value) = values.get(&parameter.name).or(parameter.default_value()) {
                        out.push_str(value);
                    }
                }
            }
        }
        out
    }

    /// Required placeholders of `template` that none of `available` satisfy.
    /// Always empty under `BindPolicy::Lenient`.
    pub fn unsatisfied<'t>(&self, template: &'t RouteTemplate, available: &[String]) -> Vec<&'t str> {
        if self.policy == BindPolicy::Lenient {
            return Vec::new();
        }
        template
            .parameters()
            .filter(|parameter| parameter.is_required())
            .filter(|parameter| !available.iter().any(|name| name.eq_ignore_ascii_case(&parameter.name)))
            .map(TemplateParameter::name)
            .collect()
    }
}
