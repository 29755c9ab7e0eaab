//! Variable contexts for expression rendering.

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::report::{ExportSettings, ReportData, ReportDate};

/// An immutable name-to-value mapping handed to the expression evaluator.
///
/// Contexts are built per slide (the global context) or per repeated item
/// and never mutated once rendering starts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderContext {
    values: Map<String, Value>,
}

impl RenderContext {
    /// An empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing JSON object.
    pub fn from_map(values: Map<String, Value>) -> Self {
        Self { values }
    }

    /// Add a value, consuming and returning the context.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Add any serializable value. Values that cannot be represented as
    /// JSON become `null`.
    pub fn with_serialized<T: Serialize>(self, key: impl Into<String>, value: &T) -> Self {
        let key = key.into();
        let value = serde_json::to_value(value).unwrap_or_else(|e| {
            log::warn!("Could not serialize context value '{}': {}", key, e);
            Value::Null
        });
        self.with(key, value)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Top-level variable names, used in diagnostics.
    pub fn keys(&self) -> Vec<&str> {
        self.values.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The context as a template engine value.
    pub fn to_template_value(&self) -> minijinja::Value {
        minijinja::Value::from_serialize(&self.values)
    }

    /// The context for static slides: `client`, `project`, `report`,
    /// `team`, `company` and `now`, plus any extra top-level report fields.
    /// Dates are formatted with the configured date format.
    pub fn global(data: &ReportData, settings: &ExportSettings, today: NaiveDate) -> Self {
        let mut project = to_object(&data.project);
        set_date(&mut project, "start_date", data.project.start_date.as_ref(), settings);
        set_date(&mut project, "end_date", data.project.end_date.as_ref(), settings);

        let mut report = to_object(&data.report);
        set_date(&mut report, "complete_date", data.report.complete_date.as_ref(), settings);
        set_date(&mut report, "created", data.report.created.as_ref(), settings);
        set_date(&mut report, "last_update", data.report.last_update.as_ref(), settings);

        let context = Self::from_map(data.extra.clone())
            .with("client", Value::Object(to_object(&data.client)))
            .with("project", Value::Object(project))
            .with("report", Value::Object(report))
            .with_serialized("team", &data.team)
            .with_serialized("company", &settings.company)
            .with("now", settings.format_date(today));

        log::debug!(
            "Static slide context - client: {}, keys: {:?}",
            data.client.name,
            context.keys()
        );

        context
    }
}

impl From<Map<String, Value>> for RenderContext {
    fn from(values: Map<String, Value>) -> Self {
        Self::from_map(values)
    }
}

fn to_object<T: Serialize>(value: &T) -> Map<String, Value> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

fn set_date(
    object: &mut Map<String, Value>,
    key: &str,
    date: Option<&ReportDate>,
    settings: &ExportSettings,
) {
    object.insert(
        key.to_string(),
        Value::String(settings.format_optional_date(date)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_data() -> ReportData {
        serde_json::from_value(json!({
            "client": { "name": "SpecterOps", "short_name": "SO" },
            "project": {
                "type": "Red Team",
                "start_date": "2024-03-01",
                "end_date": "2024-03-15"
            },
            "report": { "title": "Final Report", "complete_date": "2024-04-01" },
            "team": [{ "name": "Ada", "role": "Lead", "email": "ada@example.com" }],
            "engagement_code": "RT-42"
        }))
        .unwrap()
    }

    #[test]
    fn test_global_context_formats_dates() {
        let settings = ExportSettings::default();
        let today = NaiveDate::from_ymd_opt(2024, 4, 2).unwrap();
        let context = RenderContext::global(&sample_data(), &settings, today);

        assert_eq!(context.get("now"), Some(&json!("02 Apr 2024")));
        assert_eq!(context.get("project").unwrap()["start_date"], json!("01 Mar 2024"));
        assert_eq!(context.get("project").unwrap()["type"], json!("Red Team"));
        assert_eq!(context.get("report").unwrap()["complete_date"], json!("01 Apr 2024"));
        assert_eq!(context.get("report").unwrap()["created"], json!(""));
    }

    #[test]
    fn test_global_context_keeps_text_dates() {
        let mut data = sample_data();
        data.project.start_date = Some(ReportDate::Text("Mar 1, 2024".into()));
        let today = NaiveDate::from_ymd_opt(2024, 4, 2).unwrap();
        let context = RenderContext::global(&data, &ExportSettings::default(), today);

        assert_eq!(context.get("project").unwrap()["start_date"], json!("Mar 1, 2024"));
        assert_eq!(context.get("project").unwrap()["end_date"], json!("15 Mar 2024"));
    }

    #[test]
    fn test_global_context_includes_extra_fields_and_company() {
        let mut settings = ExportSettings::default();
        settings.company.name = "ACME Security".into();
        let today = NaiveDate::from_ymd_opt(2024, 4, 2).unwrap();
        let context = RenderContext::global(&sample_data(), &settings, today);

        assert_eq!(context.get("engagement_code"), Some(&json!("RT-42")));
        assert_eq!(context.get("company").unwrap()["name"], json!("ACME Security"));
        assert_eq!(context.get("team").unwrap()[0]["role"], json!("Lead"));
        for key in ["client", "project", "report", "team", "company", "now"] {
            assert!(context.keys().contains(&key), "missing {}", key);
        }
    }

    #[test]
    fn test_with_builds_new_context() {
        let context = RenderContext::new()
            .with("title", "Example")
            .with("cvss_score", 9.8);
        assert_eq!(context.len(), 2);
        assert_eq!(context.get("title"), Some(&json!("Example")));
        assert!(RenderContext::new().is_empty());
    }
}
