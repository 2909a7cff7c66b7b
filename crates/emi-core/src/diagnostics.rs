//! Non-fatal findings attached to a result.
//!
//! Fatal problems are [`EmiError`](crate::EmiError)s. A computation that
//! finishes but deserves a second look records an [`Issue`] instead, for
//! example an ill-conditioned earth-wire block during Kron reduction. Issues
//! travel with the result they qualify and are merged upward: a route study
//! carries every section's issues, each tagged with its section.
//!
//! ```
//! use emi_core::diagnostics::{Diagnostics, IssueCategory};
//!
//! let mut diag = Diagnostics::new();
//! diag.warn(IssueCategory::Numerical, "condition number 3.2e13 exceeds 1e12");
//! let study = Diagnostics::new().with(diag.tagged("section 4"));
//!
//! assert_eq!(study.warning_count(), 1);
//! assert_eq!(study.to_string().trim_end(), "1 warning\n  warning[numerical] section 4: condition number 3.2e13 exceeds 1e12");
//! ```

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Result produced, accuracy may suffer
    Warning,
    /// Part of the result could not be produced
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueCategory {
    /// Conditioning and round-off
    Numerical,
    /// Conductor or route placement
    Geometry,
    /// Input files and defaults
    Configuration,
}

impl fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IssueCategory::Numerical => "numerical",
            IssueCategory::Geometry => "geometry",
            IssueCategory::Configuration => "configuration",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Issue {
    pub severity: Severity,
    pub category: IssueCategory,
    pub message: String,
    /// Where it happened, e.g. "section 3" or "conductor EW"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{severity}[{}] ", self.category)?;
        if let Some(entity) = &self.entity {
            write!(f, "{entity}: ")?;
        }
        f.write_str(&self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<Issue>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, severity: Severity, category: IssueCategory, message: impl Into<String>) {
        self.issues.push(Issue {
            severity,
            category,
            message: message.into(),
            entity: None,
        });
    }

    pub fn warn(&mut self, category: IssueCategory, message: impl Into<String>) {
        self.push(Severity::Warning, category, message);
    }

    pub fn error(&mut self, category: IssueCategory, message: impl Into<String>) {
        self.push(Severity::Error, category, message);
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        self.warning_count() > 0
    }

    pub fn in_category(&self, category: IssueCategory) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(move |i| i.category == category)
    }

    pub fn merge(&mut self, other: Diagnostics) {
        self.issues.extend(other.issues);
    }

    /// Builder form of [`merge`](Self::merge).
    pub fn with(mut self, other: Diagnostics) -> Self {
        self.merge(other);
        self
    }

    /// Attach `entity` to every issue that has none yet.
    pub fn tagged(mut self, entity: &str) -> Self {
        for issue in self.issues.iter_mut().filter(|i| i.entity.is_none()) {
            issue.entity = Some(entity.to_string());
        }
        self
    }

    /// "No issues", "2 warnings", "1 warning, 1 error", ...
    pub fn summary(&self) -> String {
        let counted = |n: usize, noun: &str| format!("{n} {noun}{}", if n == 1 { "" } else { "s" });
        match (self.warning_count(), self.error_count()) {
            (0, 0) => "No issues".to_string(),
            (w, 0) => counted(w, "warning"),
            (0, e) => counted(e, "error"),
            (w, e) => format!("{}, {}", counted(w, "warning"), counted(e, "error")),
        }
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.summary())?;
        for issue in &self.issues {
            writeln!(f, "  {issue}")?;
        }
        Ok(())
    }
}
