//! Builders for the report-only slides: observations, findings and the
//! closing slides.

use serde_json::Value;

use super::{add_table, body_frame, body_index, center_cells, header_table, set_title, SlideOrchestrator};
use crate::context::RenderContext;
use crate::editor;
use crate::mapping::SlideTypeConfig;
use crate::notes::{finding_notes, prepare_for_notes};
use crate::render::RenderScope;
use crate::report::{Evidence, Finding, Observation};
use crate::rich_text::evidence_map;
use crate::types::Color;

impl SlideOrchestrator<'_> {
    pub(super) fn build_observations_overview(&mut self, config: &SlideTypeConfig) {
        let data = self.data;
        let observations = &data.observations;
        let Some(index) = self.add_slide(config) else {
            return;
        };
        let slide = &mut self.deck.slides[index];

        set_title(slide, "Positive Observations");
        let Some(body) = body_index(slide) else {
            return;
        };

        if observations.is_empty() {
            if let Some(frame) = body_frame(slide) {
                editor::append_styled_paragraph(frame, "No observations", 0);
            }
            return;
        }

        slide.shapes.remove(body);
        let mut table = header_table(&["Observation"], &[10.5], observations.len());
        for (row, observation) in observations.iter().enumerate() {
            if let Some(cell) = table.cell_mut(row + 1, 0) {
                cell.set_text(&observation.title);
            }
        }
        center_cells(&mut table);
        add_table(slide, table);
    }

    pub(super) fn build_findings_overview(&mut self, config: &SlideTypeConfig) {
        let data = self.data;
        let findings = &data.findings;
        let Some(index) = self.add_slide(config) else {
            return;
        };
        let slide = &mut self.deck.slides[index];

        set_title(slide, "Findings Overview");
        let Some(body) = body_index(slide) else {
            return;
        };

        if findings.is_empty() {
            if let Some(frame) = body_frame(slide) {
                editor::append_styled_paragraph(frame, "No findings", 0);
            }
            return;
        }

        slide.shapes.remove(body);
        let mut table = header_table(&["Finding", "Severity"], &[8.5, 2.0], findings.len());
        for (row, finding) in findings.iter().enumerate() {
            if let Some(cell) = table.cell_mut(row + 1, 0) {
                cell.set_text(&finding.title);
            }
            if let Some(cell) = table.cell_mut(row + 1, 1) {
                cell.set_text(&finding.severity);
                cell.fill = Color::parse_hex(&finding.severity_color_hex);
                if cell.fill.is_none() {
                    log::warn!(
                        "Invalid severity color '{}' for finding '{}'",
                        finding.severity_color_hex,
                        finding.title
                    );
                }
            }
        }
        center_cells(&mut table);
        add_table(slide, table);
    }

    pub(super) fn build_observations(&mut self, config: &SlideTypeConfig) {
        let data = self.data;
        for observation in &data.observations {
            let context = observation_context(observation);
            self.build_record_slide(config, &context, &observation.evidence);
        }
    }

    pub(super) fn build_findings(&mut self, config: &SlideTypeConfig) {
        let data = self.data;
        for finding in &data.findings {
            let context = finding_context(finding);
            let Some(index) = self.build_record_slide(config, &context, &finding.evidence) else {
                continue;
            };
            let text = finding_notes(finding);
            let mut lines = text.split('\n');
            let notes = self.deck.slides[index].notes_frame_mut();
            editor::replace_text_preserving_format(notes, lines.next().unwrap_or_default());
            for line in lines {
                editor::append_styled_paragraph(notes, line, 0);
            }
        }
    }

    /// Create one slide for a record, render it with the record's context
    /// and add its evidence.
    fn build_record_slide(
        &mut self,
        config: &SlideTypeConfig,
        context: &RenderContext,
        evidence: &[Evidence],
    ) -> Option<usize> {
        let index = self.add_slide(config)?;
        let evidence_by_name = evidence_map(evidence);
        let scope = RenderScope::new(context, self.converter, &evidence_by_name);
        let (slide, layout) = self.deck.slide_with_layout_mut(index)?;

        self.renderer.render_slide(slide, layout, &scope);
        for item in evidence {
            if let Err(err) = self.converter.insert_evidence(slide, item) {
                log::warn!("Failed to add evidence '{}': {}", item.friendly_name, err);
            }
        }
        Some(index)
    }

    pub(super) fn build_final(&mut self, config: &SlideTypeConfig) {
        let settings = self.settings;
        let company = &settings.company;
        let Some(index) = self.add_slide(config) else {
            return;
        };
        let slide = &mut self.deck.slides[index];

        let Some(frame) = body_frame(slide) else {
            return;
        };
        editor::clear(frame);
        if let Some(first) = frame.paragraphs.first_mut() {
            editor::set_paragraph_text(first, &company.name);
            first.line_spacing = Some(0.7);
        }
        for line in [&company.twitter, &company.email] {
            editor::append_styled_paragraph(frame, line, 0).line_spacing = Some(0.7);
        }
    }
}

fn observation_context(observation: &Observation) -> RenderContext {
    RenderContext::new()
        .with("title", observation.title.as_str())
        .with("description", prepare_for_notes(&observation.description))
}

fn finding_context(finding: &Finding) -> RenderContext {
    let recommendation = prepare_for_notes(&finding.recommendation);
    let replication = prepare_for_notes(&finding.replication_steps);
    RenderContext::new()
        .with("title", finding.title.as_str())
        .with("severity", finding.severity.as_str())
        .with("description", prepare_for_notes(&finding.description))
        .with("impact", prepare_for_notes(&finding.impact))
        .with("affected_entities", prepare_for_notes(&finding.affected_entities))
        .with("mitigation", recommendation.clone())
        .with("recommendation", recommendation)
        .with("replication", replication.clone())
        .with("replication_steps", replication)
        .with("host_detection", prepare_for_notes(&finding.host_detection_techniques))
        .with("network_detection", prepare_for_notes(&finding.network_detection_techniques))
        .with("references", prepare_for_notes(&finding.references))
        .with(
            "cvss_score",
            finding.cvss_score.clone().unwrap_or_else(|| Value::String(String::new())),
        )
        .with("cvss_vector", finding.cvss_vector.as_str())
}

#[cfg(test)]
mod tests {
    use super::super::tests::{sample_data, test_deck, today};
    use super::super::{ExportKind, SlideOrchestrator};
    use super::*;
    use crate::mapping::{MappingDocument, MappingManager, SlideMode};
    use crate::report::{ExportSettings, ReportData};
    use crate::rich_text::PlainTextConverter;
    use crate::types::{PlaceholderKind, ShapeKind, ShapeNode, Slide, Table, TextFrame};
    use serde_json::json;

    fn with_records() -> ReportData {
        let mut data = sample_data();
        data.findings = serde_json::from_value(json!([
            {
                "title": "Weak Passwords",
                "severity": "high",
                "severity_color_hex": "FF7E79",
                "description": "<p>Passwords were <b>guessable</b></p>",
                "affected_entities": "DC01",
                "cvss_score": 8.1,
                "evidence": [{ "id": "1", "friendly_name": "Cracked", "caption": "Hashcat output" }]
            },
            { "title": "Open Shares", "severity": "Low", "severity_color_hex": "zz" }
        ]))
        .unwrap();
        data.observations = serde_json::from_value(json!([
            { "title": "Strong EDR", "description": "Blocked payloads" }
        ]))
        .unwrap();
        data
    }

    fn run(types: &[(&str, usize)], data: &ReportData, settings: &ExportSettings, layout_text: &str) -> Vec<Slide> {
        let slides = types
            .iter()
            .enumerate()
            .map(|(i, (t, layout))| SlideTypeConfig::new(*t, *layout, SlideMode::Dynamic, i as i64))
            .collect();
        let mapping = MappingManager::from_document(MappingDocument { version: 1, slides });
        let mut deck = test_deck(13);
        deck.layouts[2].shapes[0] = ShapeNode::placeholder(
            2,
            "Title 1",
            PlaceholderKind::Title,
            0,
            TextFrame::from_text(layout_text),
        );
        SlideOrchestrator::new(deck, mapping, data, settings, &PlainTextConverter)
            .with_today(today())
            .run(ExportKind::Report)
            .slides
    }

    fn table(slide: &Slide) -> &Table {
        slide
            .shapes
            .iter()
            .find_map(|s| match &s.kind {
                ShapeKind::Table(table) => Some(table),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn test_findings_overview_table() {
        let slides = run(&[("findings_overview", 1)], &with_records(), &ExportSettings::default(), "");
        let table = table(&slides[0]);

        assert_eq!(slides[0].shapes[0].frame_text(), "Findings Overview");
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.cell(0, 0).unwrap().text.text(), "Finding");
        assert_eq!(table.cell(1, 1).unwrap().text.text(), "high");
        assert_eq!(table.cell(1, 1).unwrap().fill, Some([0xFF, 0x7E, 0x79]));
        assert_eq!(table.cell(2, 1).unwrap().fill, None);
    }

    #[test]
    fn test_observations_overview_table() {
        let slides = run(&[("observations_overview", 1)], &with_records(), &ExportSettings::default(), "");
        let table = table(&slides[0]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.column_widths.len(), 1);
        assert_eq!(table.cell(1, 0).unwrap().text.text(), "Strong EDR");
    }

    #[test]
    fn test_finding_slides_render_context_and_notes() {
        let slides = run(
            &[("finding", 2)],
            &with_records(),
            &ExportSettings::default(),
            "{{ title }} ({{ severity }}, {{ cvss_score }})",
        );

        assert_eq!(slides.len(), 2);
        assert_eq!(slides[0].shapes[0].frame_text(), "Weak Passwords (high, 8.1)");
        assert_eq!(slides[1].shapes[0].frame_text(), "Open Shares (Low, )");

        let notes = slides[0].notes.as_ref().unwrap().text();
        assert!(notes.starts_with("High: Weak Passwords"));
        assert!(notes.contains("AFFECTED ENTITIES\nDC01"));
        let frame = slides[0].notes.as_ref().unwrap();
        assert_eq!(frame.paragraphs[0].text(), "High: Weak Passwords");
        assert!(frame.paragraphs[1].text().is_empty());

        assert!(slides[0]
            .shapes
            .iter()
            .any(|s| s.frame_text() == "Cracked: Hashcat output"));
    }

    #[test]
    fn test_finding_context_strips_markup() {
        let findings = with_records().findings;
        let context = finding_context(&findings[0]);
        assert_eq!(context.get("description"), Some(&json!("Passwords were guessable")));
        assert_eq!(context.get("impact"), Some(&json!("N/A")));
        assert_eq!(context.get("mitigation"), context.get("recommendation"));
        assert_eq!(context.get("cvss_score"), Some(&json!(8.1)));
    }

    #[test]
    fn test_observation_slides() {
        let slides = run(&[("observation", 2)], &with_records(), &ExportSettings::default(), "Observed: {{ title }}");
        assert_eq!(slides.len(), 1);
        assert_eq!(slides[0].shapes[0].frame_text(), "Observed: Strong EDR");
        assert!(slides[0].notes.is_none());
    }

    #[test]
    fn test_final_slide_lists_company() {
        let mut settings = ExportSettings::default();
        settings.company.name = "ACME Security".into();
        settings.company.twitter = "@acme".into();
        settings.company.email = "hello@acme.test".into();

        let slides = run(&[("final", 12)], &sample_data(), &settings, "");
        let frame = slides[0].shapes[1].text_frame().unwrap();
        assert_eq!(frame.text(), "ACME Security\n@acme\nhello@acme.test");
        assert!(frame.paragraphs.iter().all(|p| p.line_spacing == Some(0.7)));
    }
}
