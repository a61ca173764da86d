/// The ReadMe form, grouped by section
///
/// Choice fields are a text box plus a drop-down of suggested values; the
/// text box always accepts free text. Values outside the suggestions are
/// drawn in the warning color.

use crate::data::form::{FieldGroup, FieldSpec, FormModel, DATE_AND_TIME, FORM_FIELDS, NOTES};

use super::theme::ThemeColors;

/// Buttons inside the form that need the application
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FormAction {
    None,
    SetNow,
    InsertTimestamp,
    LoadImage,
}

const GROUPS: [FieldGroup; 4] = [
    FieldGroup::Experiment,
    FieldGroup::Sample,
    FieldGroup::Acquisition,
    FieldGroup::Notes,
];

const LABEL_WIDTH: f32 = 190.0;

pub fn show_form_panel(ui: &mut egui::Ui, form: &mut FormModel, colors: &ThemeColors) -> FormAction {
    let mut action = FormAction::None;
    let off_vocabulary = form.off_vocabulary();

    egui::ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui| {
            ui.horizontal(|ui| {
                if ui
                    .button("🔬 Load Image Metadata…")
                    .on_hover_text("Prefill the acquisition fields from a .czi, .lif or .nd2 file")
                    .clicked()
                {
                    action = FormAction::LoadImage;
                }
                if form.extracted().is_some() {
                    ui.label(
                        egui::RichText::new("✔ image metadata attached")
                            .size(11.5)
                            .color(colors.success),
                    );
                }
            });
            ui.add_space(6.0);

            for group in GROUPS {
                ui.label(
                    egui::RichText::new(group.label())
                        .heading()
                        .strong()
                        .color(colors.group_heading),
                );
                ui.separator();

                if group == FieldGroup::Notes {
                    if notes_editor(ui, form, colors) {
                        action = FormAction::InsertTimestamp;
                    }
                    continue;
                }

                egui::Grid::new(("form_grid", group.label()))
                    .num_columns(2)
                    .spacing([12.0, 6.0])
                    .min_col_width(LABEL_WIDTH)
                    .show(ui, |ui| {
                        for spec in FORM_FIELDS.iter().filter(|f| f.group == group) {
                            let flagged = off_vocabulary.contains(&spec.name);
                            field_label(ui, spec, flagged, colors);
                            if field_editor(ui, form, spec) {
                                action = FormAction::SetNow;
                            }
                            ui.end_row();
                        }
                    });
                ui.add_space(10.0);
            }
        });

    action
}

fn field_label(ui: &mut egui::Ui, spec: &FieldSpec, flagged: bool, colors: &ThemeColors) {
    let text = egui::RichText::new(spec.name);
    if flagged {
        ui.label(text.color(colors.warning)).on_hover_text(format!(
            "{}\n\nNot one of the suggested values; it is kept as typed.",
            spec.help
        ));
    } else {
        ui.label(text).on_hover_text(spec.help);
    }
}

/// Returns true when the "Now" button was clicked.
fn field_editor(ui: &mut egui::Ui, form: &mut FormModel, spec: &FieldSpec) -> bool {
    let choices = form.choices_for(spec);
    let mut now_clicked = false;
    let Some(value) = form.value_mut(spec.name) else {
        return false;
    };

    ui.horizontal(|ui| {
        let width = (ui.available_width() - 70.0).max(160.0);
        ui.add(egui::TextEdit::singleline(value).desired_width(width))
            .on_hover_text(spec.help);

        if !choices.is_empty() {
            egui::ComboBox::from_id_salt(("choices", spec.name))
                .selected_text("")
                .width(24.0)
                .show_ui(ui, |ui| {
                    for choice in &choices {
                        if ui
                            .selectable_label(value.as_str() == choice.as_str(), choice_label(choice))
                            .clicked()
                        {
                            *value = choice.clone();
                        }
                    }
                });
        }

        if spec.name == DATE_AND_TIME
            && ui
                .button("🕑 Now")
                .on_hover_text("Fill in the current date and time")
                .clicked()
        {
            now_clicked = true;
        }
    });

    now_clicked
}

/// Returns true when the "Timestamp" button was clicked.
fn notes_editor(ui: &mut egui::Ui, form: &mut FormModel, colors: &ThemeColors) -> bool {
    let mut stamp = false;
    let help = crate::data::form::field(NOTES).map(|f| f.help).unwrap_or_default();

    ui.horizontal(|ui| {
        ui.label(egui::RichText::new(help).size(11.5).color(colors.text_muted));
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if ui.button("⏱ Timestamp").clicked() {
                stamp = true;
            }
        });
    });

    if let Some(notes) = form.value_mut(NOTES) {
        ui.add(
            egui::TextEdit::multiline(notes)
                .desired_rows(8)
                .desired_width(f32::INFINITY)
                .hint_text("Analysis intent, observations, …"),
        );
    }
    stamp
}

fn choice_label(choice: &str) -> &str {
    if choice.is_empty() {
        "(none)"
    } else {
        choice
    }
}
