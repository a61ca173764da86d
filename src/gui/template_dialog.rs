/// Template picker, shown at startup when templates exist

use crate::pipeline::templates::Template;

#[derive(Debug, Default)]
pub struct TemplateDialogState {
    pub open: bool,
    pub templates: Vec<Template>,
    pub selected: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TemplateAction {
    None,
    Apply(Template),
    Skip,
}

pub fn show_template_dialog(ctx: &egui::Context, state: &mut TemplateDialogState) -> TemplateAction {
    let mut action = TemplateAction::None;
    if !state.open {
        return action;
    }

    let mut open = state.open;
    egui::Window::new("📖 Choose a ReadMe Template")
        .open(&mut open)
        .collapsible(false)
        .resizable(true)
        .default_width(360.0)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .show(ctx, |ui| {
            ui.label("Prefill the form from a template, or start with an empty form.");
            ui.separator();

            egui::ScrollArea::vertical().max_height(260.0).show(ui, |ui| {
                for (i, template) in state.templates.iter().enumerate() {
                    let response = ui
                        .selectable_label(state.selected == Some(i), &template.name)
                        .on_hover_text(template.path.display().to_string());
                    if response.clicked() {
                        state.selected = Some(i);
                    }
                    if response.double_clicked() {
                        action = TemplateAction::Apply(template.clone());
                    }
                }
            });

            ui.separator();
            ui.horizontal(|ui| {
                let chosen = state.selected.and_then(|i| state.templates.get(i));
                if ui
                    .add_enabled(chosen.is_some(), egui::Button::new("Use Template"))
                    .clicked()
                {
                    if let Some(template) = chosen {
                        action = TemplateAction::Apply(template.clone());
                    }
                }
                if ui.button("Skip").clicked() {
                    action = TemplateAction::Skip;
                }
            });
        });

    if !open && action == TemplateAction::None {
        action = TemplateAction::Skip;
    }
    state.open = open && action == TemplateAction::None;
    action
}
