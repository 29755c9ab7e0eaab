//! Report and project records supplied by the data layer, plus the
//! deployment settings that shape generated text.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::Write;

/// Default `strftime` pattern for dates written into slides.
pub const DEFAULT_DATE_FORMAT: &str = "%d %b %Y";

/// Everything an export job renders from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportData {
    #[serde(default)]
    pub client: Client,
    #[serde(default)]
    pub project: Project,
    #[serde(default)]
    pub report: ReportInfo,
    #[serde(default)]
    pub team: Vec<TeamMember>,
    #[serde(default)]
    pub objectives: Vec<Objective>,
    #[serde(default)]
    pub findings: Vec<Finding>,
    #[serde(default)]
    pub observations: Vec<Observation>,

    /// Additional top-level fields, exposed to static slide templates as is.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A date as supplied by the data layer: either an ISO calendar date or
/// text that is already formatted for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReportDate {
    Date(NaiveDate),
    Text(String),
}

impl From<NaiveDate> for ReportDate {
    fn from(date: NaiveDate) -> Self {
        ReportDate::Date(date)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Client {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub short_name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Project {
    #[serde(default, rename = "type")]
    pub project_type: String,
    #[serde(default)]
    pub start_date: Option<ReportDate>,
    #[serde(default)]
    pub end_date: Option<ReportDate>,
    /// Rich text (HTML) description of the engagement.
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportInfo {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub complete_date: Option<ReportDate>,
    #[serde(default)]
    pub created: Option<ReportDate>,
    #[serde(default)]
    pub last_update: Option<ReportDate>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TeamMember {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Objective {
    #[serde(default)]
    pub objective: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub complete: bool,
    /// "Primary", "Secondary" or "Tertiary".
    #[serde(default)]
    pub priority: String,
}

impl Objective {
    /// Status shown on slides; completed objectives read "Achieved".
    pub fn display_status(&self) -> &str {
        if self.complete {
            "Achieved"
        } else {
            &self.status
        }
    }
}

/// A finding. Text fields may contain HTML from the rich text editor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Finding {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub severity: String,
    /// Severity color as `RRGGBB`.
    #[serde(default)]
    pub severity_color_hex: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub impact: String,
    #[serde(default)]
    pub affected_entities: String,
    #[serde(default)]
    pub recommendation: String,
    #[serde(default)]
    pub replication_steps: String,
    #[serde(default)]
    pub host_detection_techniques: String,
    #[serde(default)]
    pub network_detection_techniques: String,
    #[serde(default)]
    pub references: String,
    #[serde(default)]
    pub cvss_score: Option<Value>,
    #[serde(default)]
    pub cvss_vector: String,
    #[serde(default)]
    pub evidence: Vec<Evidence>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Observation {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub evidence: Vec<Evidence>,
}

/// An evidence attachment (screenshot or text file) referenced by a record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub friendly_name: String,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub path: String,
}

/// Company details printed on the closing slide and exposed to templates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub twitter: String,
}

/// Deployment settings for an export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportSettings {
    /// `strftime` pattern for dates.
    #[serde(default = "default_date_format")]
    pub date_format: String,
    #[serde(default)]
    pub company: CompanyInfo,
}

fn default_date_format() -> String {
    DEFAULT_DATE_FORMAT.to_string()
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            date_format: default_date_format(),
            company: CompanyInfo::default(),
        }
    }
}

impl ExportSettings {
    /// Format a date with the configured pattern. An invalid pattern falls
    /// back to [`DEFAULT_DATE_FORMAT`].
    pub fn format_date(&self, date: NaiveDate) -> String {
        let mut out = String::new();
        if write!(out, "{}", date.format(&self.date_format)).is_err() {
            log::warn!(
                "Invalid date format '{}', using '{}'",
                self.date_format,
                DEFAULT_DATE_FORMAT
            );
            return date.format(DEFAULT_DATE_FORMAT).to_string();
        }
        out
    }

    /// Format a report date. Text dates are passed through unchanged.
    pub fn format_report_date(&self, date: &ReportDate) -> String {
        match date {
            ReportDate::Date(date) => self.format_date(*date),
            ReportDate::Text(text) => text.clone(),
        }
    }

    /// Format an optional date; missing dates become an empty string.
    pub fn format_optional_date(&self, date: Option<&ReportDate>) -> String {
        date.map(|d| self.format_report_date(d)).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_report_data_defaults_missing_sections() {
        let data: ReportData = serde_json::from_value(json!({
            "client": { "name": "SpecterOps" },
            "custom_field": "kept"
        }))
        .unwrap();

        assert_eq!(data.client.name, "SpecterOps");
        assert!(data.findings.is_empty());
        assert!(data.project.start_date.is_none());
        assert_eq!(data.extra.get("custom_field"), Some(&json!("kept")));
    }

    #[test]
    fn test_project_dates_parse() {
        let project: Project = serde_json::from_value(json!({
            "type": "Red Team",
            "start_date": "2024-03-01",
            "end_date": "2024-03-15"
        }))
        .unwrap();
        assert_eq!(project.project_type, "Red Team");
        assert_eq!(
            project.start_date,
            NaiveDate::from_ymd_opt(2024, 3, 1).map(ReportDate::Date)
        );
    }

    #[test]
    fn test_preformatted_dates_pass_through() {
        let data: ReportData = serde_json::from_value(json!({
            "project": { "start_date": "Mar 1, 2024", "end_date": "Mar 15, 2024" },
            "report": { "complete_date": "2024-04-01" }
        }))
        .unwrap();
        assert_eq!(
            data.project.start_date,
            Some(ReportDate::Text("Mar 1, 2024".into()))
        );

        let settings = ExportSettings::default();
        assert_eq!(
            settings.format_optional_date(data.project.end_date.as_ref()),
            "Mar 15, 2024"
        );
        assert_eq!(
            settings.format_optional_date(data.report.complete_date.as_ref()),
            "01 Apr 2024"
        );
    }

    #[test]
    fn test_format_date_uses_pattern() {
        let settings = ExportSettings::default();
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(settings.format_date(date), "05 Mar 2024");

        let settings = ExportSettings {
            date_format: "%Y-%m-%d".into(),
            ..ExportSettings::default()
        };
        assert_eq!(settings.format_optional_date(Some(&date.into())), "2024-03-05");
        assert_eq!(settings.format_optional_date(None), "");
    }

    #[test]
    fn test_objective_display_status() {
        let mut objective = Objective {
            objective: "Gain domain admin".into(),
            status: "In Progress".into(),
            complete: false,
            priority: "Primary".into(),
        };
        assert_eq!(objective.display_status(), "In Progress");
        objective.complete = true;
        assert_eq!(objective.display_status(), "Achieved");
    }
}
