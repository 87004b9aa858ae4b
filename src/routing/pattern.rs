//! Path pattern compiler.
//!
//! Turns a route template made of literal text and `:name` segments into an
//! anchored, case-insensitive regex with one named capture per parameter.
//!
//! # Rules
//! - The whole path must match (`^...$`)
//! - One trailing slash, then a trailing query string, are tolerated
//! - A parameter matches one or more characters other than `/`, `#`, `?`
//! - `/` (and the empty template) match only an empty path or a bare slash,
//!   optionally followed by a query string
//! - Literal text is escaped, so `.` or `+` in a template are plain characters

use std::collections::{HashMap, HashSet};

use regex::Regex;
use thiserror::Error;

/// Parameter values extracted from a concrete path, keyed by name.
pub type Params = HashMap<String, String>;

const ROOT_PATTERN: &str = r"(?i)^/?(?:\?[^#]*)?$";
const PARAM_CAPTURE: &str = r"[^/#?]+?";
const TAIL: &str = r"/?(?:\?[^#]*)?$";

/// Registration-time template errors.
#[derive(Debug, Error)]
pub enum PatternError {
    #[error("route template `{template}` has a parameter with an empty name")]
    EmptyParam { template: String },

    #[error("route template `{template}` declares parameter `{name}` more than once")]
    DuplicateParam { template: String, name: String },

    #[error("route template `{template}` did not compile: {source}")]
    Invalid {
        template: String,
        #[source]
        source: regex::Error,
    },
}

/// A compiled route template.
#[derive(Debug, Clone)]
pub struct PathPattern {
    template: String,
    regex: Regex,
    names: Vec<String>,
}

impl PathPattern {
    /// Compile a template such as `/users/:id/orders`.
    pub fn compile(template: &str) -> Result<Self, PatternError> {
        if template.is_empty() || template == "/" {
            let regex = Regex::new(ROOT_PATTERN).map_err(|source| PatternError::Invalid {
                template: template.to_string(),
                source,
            })?;
            return Ok(Self {
                template: template.to_string(),
                regex,
                names: Vec::new(),
            });
        }

        let body = template.strip_suffix('/').unwrap_or(template);
        let mut expr = String::from("(?i)^");
        let mut names: Vec<String> = Vec::new();
        let mut seen = HashSet::new();
        let mut literal = String::new();
        let mut chars = body.char_indices().peekable();

        while let Some((_, c)) = chars.next() {
            let starts_param = c == '/' && matches!(chars.peek(), Some((_, ':')));
            if !starts_param {
                literal.push(c);
                continue;
            }
            chars.next();

            let mut name = String::new();
            while let Some(&(_, n)) = chars.peek() {
                if n.is_ascii_alphanumeric() || n == '_' {
                    name.push(n);
                    chars.next();
                } else {
                    break;
                }
            }
            if name.is_empty() {
                return Err(PatternError::EmptyParam {
                    template: template.to_string(),
                });
            }
            if !seen.insert(name.clone()) {
                return Err(PatternError::DuplicateParam {
                    template: template.to_string(),
                    name,
                });
            }

            expr.push_str(&regex::escape(&literal));
            literal.clear();
            expr.push_str(&format!("(?:/(?P<{name}>{PARAM_CAPTURE}))"));
            names.push(name);
        }
        expr.push_str(&regex::escape(&literal));
        expr.push_str(TAIL);

        let regex = Regex::new(&expr).map_err(|source| PatternError::Invalid {
            template: template.to_string(),
            source,
        })?;

        Ok(Self {
            template: template.to_string(),
            regex,
            names,
        })
    }

    /// The template this pattern was compiled from.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// True when the template declared at least one `:name` segment.
    pub fn has_params(&self) -> bool {
        !self.names.is_empty()
    }

    /// Parameter names in declaration order.
    pub fn param_names(&self) -> &[String] {
        &self.names
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Match `path` and return its parameters, or `None` if it does not match.
    pub fn captures(&self, path: &str) -> Option<Params> {
        let caps = self.regex.captures(path)?;
        let params = self
            .names
            .iter()
            .filter_map(|name| {
                caps.name(name)
                    .map(|value| (name.clone(), value.as_str().to_string()))
            })
            .collect();
        Some(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_pattern() {
        let p = PathPattern::compile("/").unwrap();
        assert!(!p.has_params());
        assert!(p.is_match(""));
        assert!(p.is_match("/"));
        assert!(p.is_match("/?page=2"));
        assert!(!p.is_match("/users"));
        assert!(!p.is_match("/users?page=2"));
    }

    #[test]
    fn test_slash_then_query() {
        let p = PathPattern::compile("/users/:id").unwrap();
        let params = p.captures("/users/42/?sort=1").unwrap();
        assert_eq!(params["id"], "42");
        assert!(p.is_match("/users/42?sort=1"));
        assert!(!p.is_match("/users/42?sort=1/x#top"));

        let literal = PathPattern::compile("/about").unwrap();
        assert!(literal.is_match("/about/?lang=en"));
        assert!(literal.is_match("/about?"));
    }

    #[test]
    fn test_literal_pattern() {
        let p = PathPattern::compile("/about/team").unwrap();
        assert!(!p.has_params());
        assert!(p.is_match("/about/team"));
        assert!(p.is_match("/about/team/"));
        assert!(p.is_match("/ABOUT/Team"));
        assert!(!p.is_match("/about/team/lead"));
        assert!(!p.is_match("/about"));
    }

    #[test]
    fn test_param_extraction() {
        let p = PathPattern::compile("/users/:id").unwrap();
        assert!(p.has_params());
        let params = p.captures("/users/42").unwrap();
        assert_eq!(params.get("id").map(String::as_str), Some("42"));
        assert!(p.captures("/users/42/edit").is_none());
        assert!(p.captures("/users/").is_none());
    }

    #[test]
    fn test_multiple_params() {
        let p = PathPattern::compile("/products/:sku/:id").unwrap();
        assert_eq!(p.param_names(), &["sku".to_string(), "id".to_string()]);
        let params = p.captures("/products/ab-1/7").unwrap();
        assert_eq!(params["sku"], "ab-1");
        assert_eq!(params["id"], "7");
    }

    #[test]
    fn test_trailing_slash_in_template() {
        let p = PathPattern::compile("/users/:id/orders/").unwrap();
        assert!(p.is_match("/users/1/orders"));
        assert!(p.is_match("/users/1/orders/"));
    }

    #[test]
    fn test_literal_text_is_escaped() {
        let p = PathPattern::compile("/files/report.pdf").unwrap();
        assert!(p.is_match("/files/report.pdf"));
        assert!(!p.is_match("/files/reportXpdf"));
    }

    #[test]
    fn test_param_excludes_separators() {
        let p = PathPattern::compile("/tags/:tag").unwrap();
        assert!(p.captures("/tags/a#b").is_none());
        let params = p.captures("/tags/rust?sort=new").unwrap();
        assert_eq!(params["tag"], "rust");
    }

    #[test]
    fn test_empty_param_name_is_rejected() {
        assert!(matches!(
            PathPattern::compile("/users/:"),
            Err(PatternError::EmptyParam { .. })
        ));
        assert!(matches!(
            PathPattern::compile("/users/:/edit"),
            Err(PatternError::EmptyParam { .. })
        ));
    }

    #[test]
    fn test_duplicate_param_is_rejected() {
        assert!(matches!(
            PathPattern::compile("/a/:id/b/:id"),
            Err(PatternError::DuplicateParam { .. })
        ));
    }
}
