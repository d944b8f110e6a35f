use std::fmt;
use std::str::FromStr;

use regex::Regex;

use crate::error::SecretError;

/// A `{{ ... }}` action; the capture is the trimmed action body
const ACTION_PATTERN: &str = r"\{\{\s*([^}]*?)\s*\}\}";

/// Field name bound to the secret ID inside a mapping action
const ID_FIELD: &str = ".ID";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Id,
}

/// Turns secret IDs into backend locations using a compiled mapping template.
///
/// The template syntax is a subset of Go's `text/template`: literal text plus
/// `{{ .ID }}` actions (whitespace inside the braces is optional). Every action
/// must reference `.ID`, and at least one must be present:
/// - `secret/myapp/{{ .ID }}` - Vault path
/// - `MYAPP_SECRET_{{.ID}}` - environment variable name
/// - `{{ .ID }}` - JSON key
///
/// The ID is substituted verbatim, with no escaping of any kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretMapper {
    template: String,
    segments: Vec<Segment>,
}

/// Literal text between actions; a leftover `{{` means an action never closed
fn push_literal(
    segments: &mut Vec<Segment>,
    template: &str,
    text: &str,
) -> Result<(), SecretError> {
    if text.contains("{{") {
        return Err(SecretError::mapping(template, "unclosed action"));
    }
    if !text.is_empty() {
        segments.push(Segment::Literal(text.to_string()));
    }
    Ok(())
}

impl SecretMapper {
    /// Compile a mapping template
    pub fn compile(template: &str) -> Result<Self, SecretError> {
        let action = Regex::new(ACTION_PATTERN)
            .map_err(|e| SecretError::mapping(template, e.to_string()))?;

        let mut segments = Vec::new();
        let mut id_actions = 0;
        let mut literal_start = 0;

        for caps in action.captures_iter(template) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            push_literal(&mut segments, template, &template[literal_start..whole.start()])?;

            match caps.get(1).map_or("", |m| m.as_str()) {
                ID_FIELD => {
                    segments.push(Segment::Id);
                    id_actions += 1;
                }
                "" => return Err(SecretError::mapping(template, "empty action")),
                other => {
                    return Err(SecretError::mapping(
                        template,
                        format!("unsupported action '{}', only {{{{ .ID }}}} is allowed", other),
                    ))
                }
            }

            literal_start = whole.end();
        }
        push_literal(&mut segments, template, &template[literal_start..])?;

        if id_actions == 0 {
            return Err(SecretError::mapping(template, "mapping must contain {{ .ID }}"));
        }

        Ok(Self {
            template: template.to_string(),
            segments,
        })
    }

    /// Render the backend location for a secret ID.
    ///
    /// Every syntax error is caught by [`compile`](Self::compile), so
    /// rendering a compiled mapper cannot fail.
    pub fn render(&self, id: &str) -> String {
        let mut location = String::with_capacity(self.template.len() + id.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => location.push_str(text),
                Segment::Id => location.push_str(id),
            }
        }
        location
    }

    /// The template this mapper was compiled from
    pub fn template(&self) -> &str {
        &self.template
    }
}

impl fmt::Display for SecretMapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}

impl FromStr for SecretMapper {
    type Err = SecretError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::compile(s)
    }
}
