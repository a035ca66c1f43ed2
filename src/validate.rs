//! Metadata validation
//!
//! Callers declare per-filetype expectations for extracted frontmatter; the
//! indexer checks every record before it is committed and collects the
//! failures across the whole run instead of stopping at the first.

use crate::error::ValidationIssue;
use crate::schema::FileRecord;
use serde_json::Value;
use std::collections::BTreeMap;

/// Caller-declared schema check applied to each record before commit.
pub trait MetadataValidator: Send + Sync {
    fn validate(&self, record: &FileRecord) -> Vec<ValidationIssue>;
}

/// Accepts everything.
pub struct NoValidation;

impl MetadataValidator for NoValidation {
    fn validate(&self, _record: &FileRecord) -> Vec<ValidationIssue> {
        Vec::new()
    }
}

/// Expected shape of one frontmatter field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    Boolean,
    TextArray,
}

impl FieldKind {
    fn accepts(&self, value: &Value) -> bool {
        match self {
            FieldKind::Text => value.is_string(),
            FieldKind::Number => value.is_number(),
            FieldKind::Boolean => value.is_boolean(),
            FieldKind::TextArray => value
                .as_array()
                .map(|items| items.iter().all(Value::is_string))
                .unwrap_or(false),
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            FieldKind::Text => "a string",
            FieldKind::Number => "a number",
            FieldKind::Boolean => "a boolean",
            FieldKind::TextArray => "an array of strings",
        }
    }
}

/// One declared rule for a frontmatter field.
#[derive(Debug, Clone)]
pub struct FieldRule {
    pub field: String,
    pub kind: FieldKind,
    pub required: bool,
}

/// Declarative validator: rules grouped per file type. Records whose
/// `file_type` has no declared rules pass unchecked.
#[derive(Default)]
pub struct SchemaValidator {
    rules: BTreeMap<String, Vec<FieldRule>>,
}

impl SchemaValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(mut self, file_type: &str, rules: Vec<FieldRule>) -> Self {
        self.rules.insert(file_type.to_string(), rules);
        self
    }
}

impl MetadataValidator for SchemaValidator {
    fn validate(&self, record: &FileRecord) -> Vec<ValidationIssue> {
        let Some(file_type) = &record.file_type else {
            return Vec::new();
        };
        let Some(rules) = self.rules.get(file_type) else {
            return Vec::new();
        };

        let mut issues = Vec::new();
        for rule in rules {
            match record.metadata.get(&rule.field) {
                None if rule.required => issues.push(ValidationIssue {
                    path: record.path.clone(),
                    field: rule.field.clone(),
                    message: "required field is missing".to_string(),
                }),
                Some(value) if !rule.kind.accepts(value) => issues.push(ValidationIssue {
                    path: record.path.clone(),
                    field: rule.field.clone(),
                    message: format!("expected {}, got {}", rule.kind.describe(), value),
                }),
                _ => {}
            }
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn record(file_type: Option<&str>, metadata: &[(&str, Value)]) -> FileRecord {
        FileRecord {
            id: "f1".to_string(),
            path: PathBuf::from("post.md"),
            extension: "md".to_string(),
            url_path: Some("post".to_string()),
            file_type: file_type.map(str::to_string),
            metadata: metadata
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            fields: BTreeMap::new(),
        }
    }

    fn blog_validator() -> SchemaValidator {
        SchemaValidator::new().with_rules(
            "blog",
            vec![
                FieldRule {
                    field: "title".to_string(),
                    kind: FieldKind::Text,
                    required: true,
                },
                FieldRule {
                    field: "draft".to_string(),
                    kind: FieldKind::Boolean,
                    required: false,
                },
            ],
        )
    }

    #[test]
    fn missing_required_field_is_reported_with_path_and_field() {
        let issues = blog_validator().validate(&record(Some("blog"), &[]));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field, "title");
        assert_eq!(issues[0].path, PathBuf::from("post.md"));
    }

    #[test]
    fn wrong_kind_is_reported() {
        let issues = blog_validator().validate(&record(
            Some("blog"),
            &[("title", json!("ok")), ("draft", json!("yes"))],
        ));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field, "draft");
    }

    #[test]
    fn undeclared_file_types_pass() {
        let issues = blog_validator().validate(&record(Some("note"), &[]));
        assert!(issues.is_empty());
        let issues = blog_validator().validate(&record(None, &[]));
        assert!(issues.is_empty());
    }
}
