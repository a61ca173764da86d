/// Menu bar with file operations and view settings

use std::path::{Path, PathBuf};

use crate::pipeline::extraction::supported_extensions;

/// Actions that can be triggered from the toolbar
#[derive(Debug, Clone, PartialEq)]
pub enum ToolbarAction {
    None,
    LoadImage,
    LoadReadme,
    ChooseTemplate,
    SaveReadme,
    ExportJson,
    ClearForm,
    FontLarger,
    FontSmaller,
    ThemeToggle,
    ShowMetadata,
    ShowHelp,
    ShowAbout,
}

/// Render the toolbar and return any triggered action
pub fn show_toolbar(ctx: &egui::Context, theme_label: &str, has_templates: bool) -> ToolbarAction {
    let mut action = ToolbarAction::None;

    egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
        egui::menu::bar(ui, |ui| {
            ui.menu_button("📁 File", |ui| {
                if ui.button("🔬 Load Image Metadata…").clicked() {
                    action = ToolbarAction::LoadImage;
                    ui.close_menu();
                }
                if ui.button("📂 Load ReadMe…").clicked() {
                    action = ToolbarAction::LoadReadme;
                    ui.close_menu();
                }
                if ui
                    .add_enabled(has_templates, egui::Button::new("📖 Templates…"))
                    .clicked()
                {
                    action = ToolbarAction::ChooseTemplate;
                    ui.close_menu();
                }
                ui.separator();
                if ui.button("💾 Save ReadMe…").clicked() {
                    action = ToolbarAction::SaveReadme;
                    ui.close_menu();
                }
                if ui.button("📋 Export JSON…").clicked() {
                    action = ToolbarAction::ExportJson;
                    ui.close_menu();
                }
                ui.separator();
                if ui.button("🗑 Clear Form").clicked() {
                    action = ToolbarAction::ClearForm;
                    ui.close_menu();
                }
            });

            ui.menu_button("🔍 View", |ui| {
                if ui.button("A+ Larger Text").clicked() {
                    action = ToolbarAction::FontLarger;
                    ui.close_menu();
                }
                if ui.button("A− Smaller Text").clicked() {
                    action = ToolbarAction::FontSmaller;
                    ui.close_menu();
                }
                ui.separator();
                if ui.button("🔬 Extracted Metadata").clicked() {
                    action = ToolbarAction::ShowMetadata;
                    ui.close_menu();
                }
                if ui.button(format!("🎨 Theme: {}", theme_label)).clicked() {
                    action = ToolbarAction::ThemeToggle;
                    ui.close_menu();
                }
            });

            ui.menu_button("❓ Help", |ui| {
                if ui.button("ℹ Help / Info").clicked() {
                    action = ToolbarAction::ShowHelp;
                    ui.close_menu();
                }
                if ui.button("About").clicked() {
                    action = ToolbarAction::ShowAbout;
                    ui.close_menu();
                }
            });

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui
                    .add(egui::Button::new(egui::RichText::new(theme_label).size(12.0)).corner_radius(12.0))
                    .clicked()
                {
                    action = ToolbarAction::ThemeToggle;
                }
                ui.separator();
                ui.label(egui::RichText::new(crate::data::readme::APP_NAME).weak().size(12.0));
            });
        });
    });

    action
}

/// File-open dialog for microscope images
pub fn open_image_dialog() -> Option<PathBuf> {
    let extensions: Vec<&str> = supported_extensions().collect();
    rfd::FileDialog::new()
        .set_title("Load Image Metadata")
        .add_filter("Microscope images", &extensions)
        .add_filter("Zeiss CZI", &["czi"])
        .add_filter("Leica LIF", &["lif"])
        .add_filter("Nikon ND2", &["nd2"])
        .pick_file()
}

/// File-open dialog for ReadMe text files
pub fn open_readme_dialog() -> Option<PathBuf> {
    rfd::FileDialog::new()
        .set_title("Load ReadMe")
        .add_filter("Text files", &["txt"])
        .add_filter("All files", &["*"])
        .pick_file()
}

/// Folder the ReadMe is saved into
pub fn save_dir_dialog(start: Option<&Path>) -> Option<PathBuf> {
    let mut dialog = rfd::FileDialog::new().set_title("Save ReadMe into folder");
    if let Some(dir) = start {
        dialog = dialog.set_directory(dir);
    }
    dialog.pick_folder()
}

/// Save dialog for the JSON export
pub fn save_json_dialog(default_name: &str, start: Option<&Path>) -> Option<PathBuf> {
    let mut dialog = rfd::FileDialog::new()
        .set_title("Export JSON")
        .set_file_name(default_name)
        .add_filter("JSON", &["json"]);
    if let Some(dir) = start {
        dialog = dialog.set_directory(dir);
    }
    dialog.save_file()
}
