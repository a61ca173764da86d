/// Window listing the metadata of the last imported image

use crate::data::raw::RawMetadataRecord;

use super::theme::ThemeColors;

#[derive(Debug, Default)]
pub struct MetadataWindowState {
    pub open: bool,
    pub filter: String,
}

pub fn show_metadata_window(
    ctx: &egui::Context,
    state: &mut MetadataWindowState,
    record: Option<&RawMetadataRecord>,
    unmapped: &[String],
    colors: &ThemeColors,
) {
    if !state.open {
        return;
    }

    let mut open = state.open;
    egui::Window::new("🔬 Extracted Image Metadata")
        .open(&mut open)
        .default_size([520.0, 440.0])
        .resizable(true)
        .show(ctx, |ui| {
            let Some(record) = record else {
                ui.label(
                    egui::RichText::new("No image metadata loaded.\nFile → Load Image Metadata…")
                        .italics()
                        .color(colors.text_muted),
                );
                return;
            };

            ui.horizontal(|ui| {
                ui.label("Filter:");
                ui.text_edit_singleline(&mut state.filter);
                if ui.small_button("✖").clicked() {
                    state.filter.clear();
                }
            });
            ui.label(
                egui::RichText::new(format!(
                    "{} entries, {} not used by the form (shown muted)",
                    record.len(),
                    unmapped.len()
                ))
                .size(11.0)
                .color(colors.text_muted),
            );
            ui.separator();

            let needle = state.filter.to_lowercase();
            egui::ScrollArea::vertical().show(ui, |ui| {
                egui::Grid::new("metadata_grid")
                    .num_columns(2)
                    .striped(true)
                    .spacing([16.0, 4.0])
                    .show(ui, |ui| {
                        for (key, value) in record.iter() {
                            let text = value.display();
                            if !needle.is_empty()
                                && !key.to_lowercase().contains(&needle)
                                && !text.to_lowercase().contains(&needle)
                            {
                                continue;
                            }
                            let key_text = egui::RichText::new(key).strong();
                            let key_text = if unmapped.iter().any(|k| k == key) {
                                key_text.color(colors.text_muted)
                            } else {
                                key_text
                            };
                            ui.label(key_text);
                            ui.label(egui::RichText::new(text).monospace());
                            ui.end_row();
                        }
                    });
            });
        });
    state.open = open;
}
