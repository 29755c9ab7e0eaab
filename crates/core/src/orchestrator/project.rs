//! Builders for the slides shared by project and report exports.

use super::{add_table, body_frame, body_index, center_cells, header_table, set_title, SlideOrchestrator};
use crate::editor;
use crate::mapping::SlideTypeConfig;
use crate::report::Objective;
use crate::rich_text::EvidenceMap;
use crate::types::{Paragraph, TextFrame};

const AGENDA_ITEMS: &[&str] = &[
    "Introduction",
    "Assessment Details",
    "Methodology",
    "Assessment Timeline",
    "Attack Path Overview",
    "Positive Control Observations",
    "Findings and Recommendations Overview",
    "Next Steps",
];

const OBJECTIVE_PRIORITIES: &[&str] = &["Primary", "Secondary", "Tertiary"];

impl SlideOrchestrator<'_> {
    pub(super) fn build_title(&mut self, config: &SlideTypeConfig) {
        let title = format!("{} {}", self.data.client.name, self.data.project.project_type);
        let date = self.settings.format_date(self.today);
        let Some(index) = self.add_slide(config) else {
            return;
        };
        let slide = &mut self.deck.slides[index];

        set_title(slide, &title);
        if let Some(frame) = body_frame(slide) {
            match frame.paragraphs.first_mut() {
                Some(first) => editor::set_paragraph_text(first, "Technical Outbrief"),
                None => frame.paragraphs.push(Paragraph::with_text("Technical Outbrief")),
            }
            editor::append_styled_paragraph(frame, &date, 0);
        }
    }

    pub(super) fn build_agenda(&mut self, config: &SlideTypeConfig) {
        let Some(index) = self.add_slide(config) else {
            return;
        };
        let slide = &mut self.deck.slides[index];

        set_title(slide, "Agenda");
        let Some(frame) = body_frame(slide) else {
            return;
        };
        editor::clear(frame);
        editor::remove_paragraph(frame, 0);
        for item in AGENDA_ITEMS {
            editor::append_styled_paragraph(frame, item, 0);
        }
    }

    pub(super) fn build_introduction(&mut self, config: &SlideTypeConfig) {
        let Some(index) = self.add_slide(config) else {
            return;
        };
        let data = self.data;
        let team = &data.team;
        let slide = &mut self.deck.slides[index];

        set_title(slide, "Introduction");
        let Some(frame) = body_frame(slide) else {
            return;
        };
        editor::clear(frame);
        if team.is_empty() {
            return;
        }
        editor::remove_paragraph(frame, 0);
        for member in team {
            editor::append_styled_paragraph(frame, &format!("{} – {}", member.name, member.role), 0);
            editor::append_styled_paragraph(frame, &member.email, 1);
        }
    }

    pub(super) fn build_assessment_details(&mut self, config: &SlideTypeConfig) {
        let data = self.data;
        let project = &data.project;
        let scope_line = format!("{} assessment of {}", project.project_type, data.client.name);
        let dates_line = format!(
            "Testing performed from {} to {}",
            self.settings.format_optional_date(project.start_date.as_ref()),
            self.settings.format_optional_date(project.end_date.as_ref())
        );
        let description = self.render_rich_field(&project.description);

        let Some(index) = self.add_slide(config) else {
            return;
        };
        let converter = self.converter;
        let objectives = &data.objectives;
        let slide = &mut self.deck.slides[index];

        set_title(slide, "Assessment Details");
        let Some(frame) = body_frame(slide) else {
            return;
        };
        editor::clear(frame);
        editor::remove_paragraph(frame, 0);
        editor::append_styled_paragraph(frame, &scope_line, 0);
        editor::append_styled_paragraph(frame, &dates_line, 1);

        if let Err(err) = converter.render(&description, frame, &EvidenceMap::new()) {
            log::warn!("Failed to convert project description: {}", err);
        }
        if let Some(last) = frame.paragraphs.last_mut() {
            last.level = 1;
        }

        write_objectives(frame, objectives);
    }

    pub(super) fn build_timeline(&mut self, config: &SlideTypeConfig) {
        let project = &self.data.project;
        let start = self.settings.format_optional_date(project.start_date.as_ref());
        let end = self.settings.format_optional_date(project.end_date.as_ref());
        let Some(index) = self.add_slide(config) else {
            return;
        };
        let slide = &mut self.deck.slides[index];

        set_title(slide, "Assessment Timeline");
        if let Some(body) = body_index(slide) {
            slide.shapes.remove(body);
        }

        let mut table = header_table(&["Date", "Action Item"], &[2.0, 8.5], 3);
        let rows = [
            (&start, "Assessment execution began"),
            (&end, "Assessment execution completed"),
            (&end, "Draft report delivery"),
        ];
        for (row, (date, action)) in rows.iter().enumerate() {
            if let Some(cell) = table.cell_mut(row + 1, 0) {
                cell.set_text(date);
            }
            if let Some(cell) = table.cell_mut(row + 1, 1) {
                cell.set_text(action);
            }
        }
        center_cells(&mut table);
        add_table(slide, table);
    }

    /// Expand expressions in a rich text field with the global context.
    /// Falls back to the raw value when rendering fails.
    pub(super) fn render_rich_field(&self, value: &str) -> String {
        match self.renderer.render_text(value, &self.global) {
            Ok(rendered) => rendered,
            Err(err) => {
                log::warn!("Failed to render rich text field: {}", err);
                value.to_string()
            }
        }
    }
}

/// Objectives grouped by priority: a heading per group, then one bullet per
/// objective with its status.
fn write_objectives(frame: &mut TextFrame, objectives: &[Objective]) {
    for priority in OBJECTIVE_PRIORITIES {
        let group: Vec<&Objective> = objectives.iter().filter(|o| o.priority == *priority).collect();
        if group.is_empty() {
            continue;
        }
        editor::append_styled_paragraph(frame, &format!("{} Objectives", priority), 0);
        for objective in group {
            editor::append_styled_paragraph(
                frame,
                &format!("{} – {}", objective.objective, objective.display_status()),
                1,
            );
        }
    }
}
