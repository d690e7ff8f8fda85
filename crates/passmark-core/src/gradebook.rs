//! In-memory gradebook.
//!
//! Holds assessments, categories and subject configs, answers
//! [`GradebookSource`] queries, and loads from TOML files.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::model::{Assessment, AssessmentKind, Category, GradeScale, SubjectConfig};
use crate::traits::GradebookSource;

/// Assessments, categories and configs for any number of subjects.
#[derive(Debug, Clone, Default)]
pub struct Gradebook {
    assessments: Vec<Assessment>,
    categories: Vec<Category>,
    configs: HashMap<String, SubjectConfig>,
}

impl Gradebook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an assessment (matched on subject and id).
    pub fn upsert_assessment(&mut self, assessment: Assessment) {
        match self
            .assessments
            .iter_mut()
            .find(|a| a.subject_id == assessment.subject_id && a.id == assessment.id)
        {
            Some(existing) => *existing = assessment,
            None => self.assessments.push(assessment),
        }
    }

    /// Insert or replace a category (matched on subject and id).
    pub fn upsert_category(&mut self, category: Category) {
        match self
            .categories
            .iter_mut()
            .find(|c| c.subject_id == category.subject_id && c.id == category.id)
        {
            Some(existing) => *existing = category,
            None => self.categories.push(category),
        }
    }

    pub fn set_config(&mut self, config: SubjectConfig) {
        self.configs.insert(config.subject_id.clone(), config);
    }

    /// Record a score for an existing assessment. Returns `false` if it does not exist.
    pub fn record_value(&mut self, subject_id: &str, assessment_id: &str, value: Decimal) -> bool {
        match self
            .assessments
            .iter_mut()
            .find(|a| a.subject_id == subject_id && a.id == assessment_id)
        {
            Some(assessment) => {
                assessment.value = Some(value);
                true
            }
            None => false,
        }
    }

    pub fn remove_assessment(
        &mut self,
        subject_id: &str,
        assessment_id: &str,
    ) -> Option<Assessment> {
        let index = self
            .assessments
            .iter()
            .position(|a| a.subject_id == subject_id && a.id == assessment_id)?;
        Some(self.assessments.remove(index))
    }

    /// Remove a category and every assessment filed under it.
    /// Returns the number of assessments removed, or `None` if the category does not exist.
    pub fn remove_category(&mut self, subject_id: &str, category_id: &str) -> Option<usize> {
        let index = self
            .categories
            .iter()
            .position(|c| c.subject_id == subject_id && c.id == category_id)?;
        self.categories.remove(index);

        let before = self.assessments.len();
        self.assessments.retain(|a| {
            !(a.subject_id == subject_id && a.category_id.as_deref() == Some(category_id))
        });
        let removed = before - self.assessments.len();
        tracing::debug!(subject = subject_id, category = category_id, removed, "removed category");
        Some(removed)
    }

    /// Remove a subject with its assessments, categories and config.
    /// Returns `false` if nothing was stored for it.
    pub fn remove_subject(&mut self, subject_id: &str) -> bool {
        let before = self.assessments.len() + self.categories.len();
        self.assessments.retain(|a| a.subject_id != subject_id);
        self.categories.retain(|c| c.subject_id != subject_id);
        let had_config = self.configs.remove(subject_id).is_some();
        had_config || before != self.assessments.len() + self.categories.len()
    }

    /// Every subject id with anything stored, sorted.
    pub fn subject_ids(&self) -> Vec<String> {
        let ids: BTreeSet<&str> = self
            .assessments
            .iter()
            .map(|a| a.subject_id.as_str())
            .chain(self.categories.iter().map(|c| c.subject_id.as_str()))
            .chain(self.configs.keys().map(String::as_str))
            .collect();
        ids.into_iter().map(str::to_string).collect()
    }

    /// Load a gradebook from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read gradebook file: {}", path.display()))?;
        Self::from_toml_str(&content, path)
    }

    /// Parse a gradebook from a TOML string.
    pub fn from_toml_str(content: &str, source_path: &Path) -> Result<Self> {
        let parsed: TomlGradebook = toml::from_str(content)
            .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

        let mut gradebook = Gradebook::new();
        for subject in parsed.subjects {
            let config = subject
                .config()
                .with_context(|| format!("invalid scale for subject {}", subject.id))?;
            let default_max_value = config
                .as_ref()
                .map(|c| c.max_grade)
                .unwrap_or(Decimal::ONE_HUNDRED);
            if let Some(config) = config {
                gradebook.set_config(config);
            }

            for c in subject.categories {
                gradebook.upsert_category(Category {
                    id: c.id,
                    subject_id: subject.id.clone(),
                    name: c.name,
                    weight: c.weight,
                });
            }

            for a in subject.assessments {
                let kind: AssessmentKind = match a.kind {
                    Some(kind) => kind.parse().map_err(|e: String| anyhow::anyhow!("{}", e))?,
                    None => AssessmentKind::default(),
                };
                gradebook.upsert_assessment(Assessment {
                    id: a.id,
                    subject_id: subject.id.clone(),
                    category_id: a.category,
                    value: a.value,
                    max_value: a.max_value.unwrap_or(default_max_value),
                    weight: a.weight,
                    kind,
                    description: a.description,
                });
            }
        }

        Ok(gradebook)
    }
}

impl GradebookSource for Gradebook {
    fn assessments(&self, subject_id: &str) -> Vec<Assessment> {
        self.assessments
            .iter()
            .filter(|a| a.subject_id == subject_id)
            .cloned()
            .collect()
    }

    fn categories(&self, subject_id: &str) -> Vec<Category> {
        self.categories
            .iter()
            .filter(|c| c.subject_id == subject_id)
            .cloned()
            .collect()
    }

    fn config(&self, subject_id: &str) -> Option<SubjectConfig> {
        self.configs.get(subject_id).cloned()
    }
}

#[derive(Debug, Deserialize)]
struct TomlGradebook {
    #[serde(default)]
    subjects: Vec<TomlSubject>,
}

#[derive(Debug, Deserialize)]
struct TomlSubject {
    id: String,
    #[serde(default)]
    scale: Option<String>,
    #[serde(default)]
    min_grade: Option<Decimal>,
    #[serde(default)]
    passing_grade: Option<Decimal>,
    #[serde(default)]
    max_grade: Option<Decimal>,
    #[serde(default)]
    categories: Vec<TomlCategory>,
    #[serde(default)]
    assessments: Vec<TomlAssessment>,
}

impl TomlSubject {
    /// A preset scale with per-field overrides. `None` when nothing is configured.
    fn config(&self) -> Result<Option<SubjectConfig>> {
        if self.scale.is_none()
            && self.min_grade.is_none()
            && self.passing_grade.is_none()
            && self.max_grade.is_none()
        {
            return Ok(None);
        }
        let scale: GradeScale = match &self.scale {
            Some(s) => s.parse().map_err(|e: String| anyhow::anyhow!("{}", e))?,
            None => GradeScale::Custom,
        };
        let mut config = SubjectConfig::from_scale(self.id.clone(), scale);
        if let Some(min) = self.min_grade {
            config.min_grade = min;
        }
        if let Some(passing) = self.passing_grade {
            config.passing_grade = passing;
        }
        if let Some(max) = self.max_grade {
            config.max_grade = max;
        }
        Ok(Some(config))
    }
}

#[derive(Debug, Deserialize)]
struct TomlCategory {
    id: String,
    name: String,
    weight: Decimal,
}

#[derive(Debug, Deserialize)]
struct TomlAssessment {
    id: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    value: Option<Decimal>,
    #[serde(default)]
    max_value: Option<Decimal>,
    weight: Decimal,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

/// A warning from gradebook validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The subject the warning concerns.
    pub subject_id: String,
    /// The assessment or category id (if applicable).
    pub item_id: Option<String>,
    /// Warning message.
    pub message: String,
}

/// Validate a gradebook for common data issues.
pub fn validate_gradebook(gradebook: &Gradebook) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    for subject_id in gradebook.subject_ids() {
        let assessments = gradebook.assessments(&subject_id);
        let categories = gradebook.categories(&subject_id);
        let mut warn = |item_id: Option<&str>, message: String| {
            warnings.push(ValidationWarning {
                subject_id: subject_id.clone(),
                item_id: item_id.map(str::to_string),
                message,
            })
        };

        match gradebook.config(&subject_id) {
            None => warn(None, "no grading configuration".into()),
            Some(config) => {
                if let Err(message) = config.validate() {
                    warn(None, message);
                }
            }
        }

        // Category weights need not sum to 100, but usually do
        if !categories.is_empty() {
            let total: Decimal = categories.iter().map(|c| c.weight).sum();
            if total != Decimal::ONE_HUNDRED {
                warn(None, format!("category weights sum to {total}, not 100"));
            }
        }

        let category_ids: HashSet<&str> = categories.iter().map(|c| c.id.as_str()).collect();
        let mut seen_ids = HashSet::new();
        for a in &assessments {
            if !seen_ids.insert(a.id.as_str()) {
                warn(Some(&a.id), format!("duplicate assessment ID: {}", a.id));
            }
            if let Some(category_id) = &a.category_id {
                if !category_ids.contains(category_id.as_str()) {
                    warn(
                        Some(&a.id),
                        format!("unknown category {category_id}, weighted as uncategorized"),
                    );
                }
            }
            if a.weight < Decimal::ZERO || a.weight > Decimal::ONE_HUNDRED {
                warn(Some(&a.id), format!("weight {} outside 0-100", a.weight));
            }
            if a.max_value <= Decimal::ZERO {
                warn(Some(&a.id), format!("max value {} is not positive", a.max_value));
            }
            if let Some(value) = a.value {
                if value < Decimal::ZERO || value > a.max_value {
                    warn(
                        Some(&a.id),
                        format!("value {value} outside 0-{}", a.max_value),
                    );
                }
            }
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::path::PathBuf;

    const VALID_TOML: &str = r#"
[[subjects]]
id = "calc-1"
scale = "chilean"

[[subjects.categories]]
id = "exams"
name = "Exams"
weight = 70

[[subjects.categories]]
id = "labs"
name = "Labs"
weight = 30

[[subjects.assessments]]
id = "midterm"
category = "exams"
value = 5.2
weight = 50
kind = "exam"
description = "Midterm"

[[subjects.assessments]]
id = "final"
category = "exams"
weight = 50
kind = "exam"

[[subjects.assessments]]
id = "lab-1"
category = "labs"
value = 80
max_value = 100
weight = 100
kind = "homework"

[[subjects]]
id = "history"
"#;

    fn parse(content: &str) -> Result<Gradebook> {
        Gradebook::from_toml_str(content, &PathBuf::from("gradebook.toml"))
    }

    #[test]
    fn parse_valid_toml() {
        let book = parse(VALID_TOML).unwrap();
        assert_eq!(book.subject_ids(), vec!["calc-1"]);

        let config = book.config("calc-1").unwrap();
        assert_eq!(config.scale, GradeScale::Chilean);
        assert_eq!(config.passing_grade, dec!(4));

        let assessments = book.assessments("calc-1");
        assert_eq!(assessments.len(), 3);
        assert_eq!(assessments[0].value, Some(dec!(5.2)));
        // defaults to the subject max grade
        assert_eq!(assessments[0].max_value, dec!(7));
        assert!(assessments[1].is_pending());
        assert_eq!(assessments[2].kind, AssessmentKind::Homework);
        assert_eq!(book.categories("calc-1").len(), 2);

        assert!(book.config("history").is_none());
    }

    #[test]
    fn scale_overrides_apply() {
        let book = parse(
            r#"
[[subjects]]
id = "s"
scale = "utfsm"
passing_grade = 60
"#,
        )
        .unwrap();
        let config = book.config("s").unwrap();
        assert_eq!(config.min_grade, dec!(0));
        assert_eq!(config.passing_grade, dec!(60));
        assert_eq!(config.max_grade, dec!(100));
    }

    #[test]
    fn parse_unknown_scale_fails() {
        let result = parse(
            r#"
[[subjects]]
id = "s"
scale = "american"
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn parse_malformed_toml() {
        assert!(parse("this is not [valid toml }{").is_err());
    }

    #[test]
    fn remove_category_cascades_to_assessments() {
        let mut book = parse(VALID_TOML).unwrap();
        assert_eq!(book.remove_category("calc-1", "exams"), Some(2));
        assert_eq!(book.assessments("calc-1").len(), 1);
        assert_eq!(book.categories("calc-1").len(), 1);
        assert_eq!(book.remove_category("calc-1", "exams"), None);
    }

    #[test]
    fn remove_subject_cascades() {
        let mut book = parse(VALID_TOML).unwrap();
        assert!(book.remove_subject("calc-1"));
        assert!(book.assessments("calc-1").is_empty());
        assert!(book.categories("calc-1").is_empty());
        assert!(book.config("calc-1").is_none());
        assert!(!book.remove_subject("calc-1"));
    }

    #[test]
    fn record_and_remove_assessment() {
        let mut book = parse(VALID_TOML).unwrap();
        assert!(book.record_value("calc-1", "final", dec!(6)));
        assert!(!book.record_value("calc-1", "missing", dec!(6)));
        assert!(book.assessments("calc-1").iter().all(|a| !a.is_pending()));

        let removed = book.remove_assessment("calc-1", "lab-1").unwrap();
        assert_eq!(removed.id, "lab-1");
        assert_eq!(book.assessments("calc-1").len(), 2);
    }

    #[test]
    fn validate_flags_data_issues() {
        let mut book = parse(VALID_TOML).unwrap();
        book.upsert_assessment(Assessment {
            id: "ghost".into(),
            subject_id: "calc-1".into(),
            category_id: Some("projects".into()),
            value: Some(dec!(9)),
            max_value: dec!(7),
            weight: dec!(20),
            kind: AssessmentKind::Project,
            description: None,
        });
        book.upsert_category(Category {
            id: "extra".into(),
            subject_id: "calc-1".into(),
            name: "Extra".into(),
            weight: dec!(10),
        });

        let warnings = validate_gradebook(&book);
        let messages: Vec<&str> = warnings.iter().map(|w| w.message.as_str()).collect();
        assert!(messages.iter().any(|m| m.contains("unknown category projects")));
        assert!(messages.iter().any(|m| m.contains("value 9 outside")));
        assert!(messages.iter().any(|m| m.contains("sum to 110")));
    }

    #[test]
    fn validate_missing_config() {
        let mut book = Gradebook::new();
        book.upsert_category(Category {
            id: "c".into(),
            subject_id: "orphan".into(),
            name: "C".into(),
            weight: dec!(100),
        });
        let warnings = validate_gradebook(&book);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("no grading configuration"));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gradebook.toml");
        std::fs::write(&path, VALID_TOML).unwrap();

        let book = Gradebook::load(&path).unwrap();
        assert_eq!(book.assessments("calc-1").len(), 3);
        assert!(Gradebook::load(&dir.path().join("missing.toml")).is_err());
    }
}
