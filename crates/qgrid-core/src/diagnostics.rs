//! Diagnostic trail for non-fatal defects found while building, repairing,
//! and dispatching a network.
//!
//! Every automatic correction (filled series values, virtual links, emergency
//! capacity, provider fallbacks, cache invalidation) is recorded here with a
//! category so callers can audit what the pipeline changed.
//!
//! # Example
//!
//! ```
//! use qgrid_core::diagnostics::{Diagnostics, Severity};
//!
//! let mut diag = Diagnostics::new();
//! diag.add_warning("connectivity", "added virtual link to reference bus");
//! diag.add_warning_with_entity("provider", "production series unavailable", "Parc Jean-Lapierre");
//!
//! assert_eq!(diag.warning_count(), 2);
//! assert_eq!(diag.issues_by_category("provider").count(), 1);
//! ```

use serde::{Deserialize, Serialize};

/// Severity level for diagnostic issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Unusual but the run continued (e.g., defaulted value)
    Warning,
    /// An element could not be processed
    Error,
}

/// A single diagnostic issue encountered during a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticIssue {
    pub severity: Severity,
    /// Category for grouping (e.g., "alignment", "connectivity", "capacity", "provider")
    pub category: String,
    pub message: String,
    /// Snapshot index the issue applies to, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<usize>,
    /// Entity reference (generator, load, or bus name)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
}

impl DiagnosticIssue {
    pub fn new(
        severity: Severity,
        category: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category: category.into(),
            message: message.into(),
            snapshot: None,
            entity: None,
        }
    }

    pub fn with_snapshot(mut self, snapshot: usize) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }
}

impl std::fmt::Display for DiagnosticIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let severity = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };

        write!(f, "[{}:{}] {}", severity, self.category, self.message)?;

        if let Some(entity) = &self.entity {
            write!(f, " ({})", entity)?;
        }
        if let Some(snapshot) = self.snapshot {
            write!(f, " at snapshot {}", snapshot)?;
        }

        Ok(())
    }
}

/// Collection of diagnostic issues attached to a simulation result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<DiagnosticIssue>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a raw issue directly
    pub fn add(&mut self, issue: DiagnosticIssue) {
        self.issues.push(issue);
    }

    // =========================================================================
    // Warning Methods
    // =========================================================================

    pub fn add_warning(&mut self, category: &str, message: &str) {
        self.issues
            .push(DiagnosticIssue::new(Severity::Warning, category, message));
    }

    pub fn add_warning_with_entity(&mut self, category: &str, message: &str, entity: &str) {
        self.issues
            .push(DiagnosticIssue::new(Severity::Warning, category, message).with_entity(entity));
    }

    pub fn add_warning_at_snapshot(&mut self, category: &str, message: &str, snapshot: usize) {
        self.issues.push(
            DiagnosticIssue::new(Severity::Warning, category, message).with_snapshot(snapshot),
        );
    }

    // =========================================================================
    // Error Methods
    // =========================================================================

    pub fn add_error(&mut self, category: &str, message: &str) {
        self.issues
            .push(DiagnosticIssue::new(Severity::Error, category, message));
    }

    // =========================================================================
    // Query Methods
    // =========================================================================

    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count()
    }

    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count()
    }

    /// Get issues filtered by category
    pub fn issues_by_category<'a>(
        &'a self,
        category: &'a str,
    ) -> impl Iterator<Item = &'a DiagnosticIssue> {
        self.issues.iter().filter(move |i| i.category == category)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &DiagnosticIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
    }

    // =========================================================================
    // Utility Methods
    // =========================================================================

    pub fn summary(&self) -> String {
        let warnings = self.warning_count();
        let errors = self.error_count();

        match (warnings, errors) {
            (0, 0) => "No issues".to_string(),
            (w, 0) => format!("{} warning{}", w, if w == 1 { "" } else { "s" }),
            (0, e) => format!("{} error{}", e, if e == 1 { "" } else { "s" }),
            (w, e) => format!(
                "{} warning{}, {} error{}",
                w,
                if w == 1 { "" } else { "s" },
                e,
                if e == 1 { "" } else { "s" }
            ),
        }
    }
}

impl std::fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Diagnostics: {}", self.summary())?;
        for issue in &self.issues {
            writeln!(f, "  {}", issue)?;
        }
        Ok(())
    }
}
