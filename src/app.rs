/// Main application state and eframe::App implementation
///
/// Owns the one `FormModel` and routes every user action (toolbar, form
/// buttons, dropped files) to the data and pipeline layers. Failed actions
/// report in the status bar and leave the form as it was.

use std::path::{Path, PathBuf};

use chrono::Local;
use eframe::egui;

use crate::config::Config;
use crate::data::form::{FormModel, PROJECT_NAME};
use crate::data::readme::{self, ReadmeDocument};
use crate::error::Result;
use crate::gui::form_panel::{self, FormAction};
use crate::gui::help;
use crate::gui::metadata_panel::{self, MetadataWindowState};
use crate::gui::template_dialog::{self, TemplateAction, TemplateDialogState};
use crate::gui::theme::{self, AppTheme, ThemeColors, MAX_FONT_SIZE, MIN_FONT_SIZE};
use crate::gui::toolbar::{self, ToolbarAction};
use crate::pipeline::extraction::{self, ImageFormat};
use crate::pipeline::mapping;
use crate::pipeline::rdm::{self, RdmStatus};
use crate::pipeline::templates::{self, Template};

/// A save that is waiting for the user to confirm replacing a file
#[derive(Debug, Clone, PartialEq)]
struct PendingOverwrite {
    dir: PathBuf,
    path: PathBuf,
}

/// The main application
pub struct ReadmeApp {
    /// Form values and the metadata of the last imported image
    form: FormModel,
    config: Config,

    rdm_status: RdmStatus,
    templates: Vec<Template>,
    /// Raw keys of the last image no mapping rule reads
    unmapped: Vec<String>,
    last_format: Option<ImageFormat>,
    /// Default folder for save dialogs: that of the last image or ReadMe
    save_dir: Option<PathBuf>,

    /// GUI sub-states
    template_dialog_state: TemplateDialogState,
    metadata_state: MetadataWindowState,
    pending_overwrite: Option<PendingOverwrite>,
    error_dialog: Option<String>,

    /// Status messages
    status_message: String,
    show_help: bool,
    show_about: bool,

    current_theme: AppTheme,
    theme_colors: ThemeColors,
    font_size: f32,

    /// Dropped files buffer
    dropped_files: Vec<PathBuf>,
}

impl ReadmeApp {
    pub fn new(cc: &eframe::CreationContext<'_>, config: Config, startup_file: Option<PathBuf>) -> Self {
        let mut app = Self::from_config(config);

        theme::apply_theme(&cc.egui_ctx, app.current_theme);
        let mut style = (*cc.egui_ctx.style()).clone();
        style.spacing.item_spacing = egui::vec2(8.0, 5.0);
        style.spacing.button_padding = egui::vec2(8.0, 4.0);
        style.spacing.indent = 18.0;
        cc.egui_ctx.set_style(style);
        theme::apply_font_size(&cc.egui_ctx, app.font_size);

        if let Some(path) = startup_file {
            app.template_dialog_state.open = false;
            app.open_path(&path);
        }
        app
    }

    /// Application state without a window: templates discovered, RDM
    /// gateway probed.
    fn from_config(config: Config) -> Self {
        let general = &config.general;

        let rdm_status = rdm::probe(general.rdm_gateway.as_deref());
        let mut form = FormModel::new();
        form.set_rdm_choices(rdm_status.projects().to_vec());

        let templates = match templates::discover(&general.template_dir) {
            Ok(found) => found,
            Err(e) => {
                log::warn!("Template discovery skipped: {}", e);
                Vec::new()
            }
        };

        let status_message = match &rdm_status {
            RdmStatus::Unavailable(_) => {
                "RDM gateway not reachable: type the RDM project into RDM Info".to_string()
            }
            _ => "Ready. Fill in the form or load image metadata.".to_string(),
        };

        Self {
            form,
            rdm_status,
            template_dialog_state: TemplateDialogState {
                open: !templates.is_empty(),
                templates: templates.clone(),
                selected: None,
            },
            templates,
            unmapped: Vec::new(),
            last_format: None,
            save_dir: None,
            metadata_state: MetadataWindowState::default(),
            pending_overwrite: None,
            error_dialog: None,
            status_message,
            show_help: false,
            show_about: false,
            current_theme: general.theme,
            theme_colors: ThemeColors::from_theme(general.theme),
            font_size: general.font_size,
            dropped_files: Vec::new(),
            config,
        }
    }

    // ────────────────────────────────────────────────────────────
    // Loading
    // ────────────────────────────────────────────────────────────

    /// Route a file by extension: `.txt` is a ReadMe, anything else an image.
    fn open_path(&mut self, path: &Path) {
        let is_text = path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("txt"))
            .unwrap_or(false);
        if is_text {
            self.load_readme(path);
        } else {
            self.load_image(path);
        }
    }

    fn load_image(&mut self, path: &Path) {
        match self.import_image(path) {
            Ok(filled) => {
                self.status_message = format!(
                    "Read {} metadata from {}: {} fields filled",
                    self.last_format.map(|f| f.label()).unwrap_or("image"),
                    file_label(path),
                    filled
                );
            }
            Err(e) => {
                log::error!("{}", e);
                self.status_message = e.to_string();
            }
        }
    }

    /// Extract and map first; the form only changes once both succeeded.
    fn import_image(&mut self, path: &Path) -> Result<usize> {
        let (format, record) = extraction::extract(path)?;
        let mapped = mapping::map_record(format, &record);

        let filled = self.form.apply(mapped.pairs());
        self.form.set_extracted(Some(record));
        self.unmapped = mapped.unmapped;
        self.last_format = Some(format);
        self.save_dir = path.parent().map(Path::to_path_buf);
        Ok(filled)
    }

    fn load_readme(&mut self, path: &Path) {
        match readme::load(path) {
            Ok(doc) => {
                let n = self.apply_document(&doc);
                self.save_dir = path.parent().map(Path::to_path_buf);
                self.status_message = format!("Loaded {} fields from {}", n, file_label(path));
            }
            Err(e) => self.report_failure("Load failed", e),
        }
    }

    fn apply_template(&mut self, template: &Template) {
        match template.load() {
            Ok(doc) => {
                let n = self.apply_document(&doc);
                log::info!("Applied template '{}'", template.name);
                self.status_message = format!("Template '{}' applied ({} fields)", template.name, n);
            }
            Err(e) => self.report_failure("Template failed", e),
        }
    }

    fn apply_document(&mut self, doc: &ReadmeDocument) -> usize {
        if doc.extracted().is_some() {
            self.unmapped.clear();
            self.last_format = None;
        }
        doc.apply_to(&mut self.form)
    }

    // ────────────────────────────────────────────────────────────
    // Saving
    // ────────────────────────────────────────────────────────────

    /// Save into `dir`, asking first when the ReadMe already exists.
    fn save_into(&mut self, dir: &Path) {
        let path = dir.join(readme::readme_file_name(
            self.form.get(PROJECT_NAME).unwrap_or_default(),
        ));
        self.save_dir = Some(dir.to_path_buf());
        if path.exists() {
            self.status_message = format!("{} exists: confirm to replace it", file_label(&path));
            self.pending_overwrite = Some(PendingOverwrite {
                dir: dir.to_path_buf(),
                path,
            });
            return;
        }
        self.write_readme(dir);
    }

    fn write_readme(&mut self, dir: &Path) {
        let header = readme::generator_header(Local::now().naive_local());
        match readme::save_readme(dir, &self.form, Some(&header)) {
            Ok(path) => self.status_message = format!("ReadMe saved: {}", path.display()),
            Err(e) => self.report_failure("Save failed", e),
        }
    }

    fn confirm_overwrite(&mut self) {
        if let Some(pending) = self.pending_overwrite.take() {
            log::info!("Replacing {}", pending.path.display());
            self.write_readme(&pending.dir);
        }
    }

    fn cancel_overwrite(&mut self) {
        if self.pending_overwrite.take().is_some() {
            self.status_message = "Save cancelled".to_string();
        }
    }

    fn export_json(&mut self, path: &Path) {
        let doc = ReadmeDocument::from_form(&self.form);
        match readme::write_json(path, &doc) {
            Ok(()) => self.status_message = format!("JSON exported: {}", path.display()),
            Err(e) => self.report_failure("Export failed", e),
        }
    }

    fn report_failure(&mut self, what: &str, err: crate::error::ReadmeError) {
        log::error!("{}: {}", what, err);
        self.status_message = format!("{}: {}", what, err);
        self.error_dialog = Some(format!("{}\n\n{}", what, err));
    }

    // ────────────────────────────────────────────────────────────
    // Actions
    // ────────────────────────────────────────────────────────────

    fn handle_toolbar_action(&mut self, action: ToolbarAction) {
        match action {
            ToolbarAction::LoadImage => {
                if let Some(path) = toolbar::open_image_dialog() {
                    self.load_image(&path);
                }
            }
            ToolbarAction::LoadReadme => {
                if let Some(path) = toolbar::open_readme_dialog() {
                    self.load_readme(&path);
                }
            }
            ToolbarAction::ChooseTemplate => {
                if let Ok(found) = templates::discover(&self.config.general.template_dir) {
                    self.templates = found;
                }
                self.template_dialog_state.templates = self.templates.clone();
                self.template_dialog_state.selected = None;
                self.template_dialog_state.open = true;
            }
            ToolbarAction::SaveReadme => {
                if let Some(dir) = toolbar::save_dir_dialog(self.save_dir.as_deref()) {
                    self.save_into(&dir);
                }
            }
            ToolbarAction::ExportJson => {
                let name = readme::json_file_name(self.form.get(PROJECT_NAME).unwrap_or_default());
                if let Some(path) = toolbar::save_json_dialog(&name, self.save_dir.as_deref()) {
                    self.export_json(&path);
                }
            }
            ToolbarAction::ClearForm => {
                self.form.clear();
                self.unmapped.clear();
                self.last_format = None;
                self.status_message = "Form cleared".to_string();
            }
            ToolbarAction::FontLarger => self.set_font_size(self.font_size + 1.0),
            ToolbarAction::FontSmaller => self.set_font_size(self.font_size - 1.0),
            ToolbarAction::ThemeToggle => {
                self.current_theme = self.current_theme.next();
                self.theme_colors = ThemeColors::from_theme(self.current_theme);
            }
            ToolbarAction::ShowMetadata => {
                self.metadata_state.open = true;
            }
            ToolbarAction::ShowHelp => {
                self.show_help = true;
            }
            ToolbarAction::ShowAbout => {
                self.show_about = true;
            }
            ToolbarAction::None => {}
        }
    }

    fn handle_form_action(&mut self, action: FormAction) {
        match action {
            FormAction::SetNow => self.form.set_now(),
            FormAction::InsertTimestamp => self.form.insert_timestamp(),
            FormAction::LoadImage => self.handle_toolbar_action(ToolbarAction::LoadImage),
            FormAction::None => {}
        }
    }

    fn set_font_size(&mut self, size: f32) {
        self.font_size = size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
        self.status_message = format!("Text size {:.0}", self.font_size);
    }

    fn handle_template_action(&mut self, action: TemplateAction) {
        match action {
            TemplateAction::Apply(template) => self.apply_template(&template),
            TemplateAction::Skip => {
                self.status_message = "Starting with an empty form".to_string();
            }
            TemplateAction::None => {}
        }
    }

    // ────────────────────────────────────────────────────────────
    // Windows
    // ────────────────────────────────────────────────────────────

    fn show_overwrite_dialog(&mut self, ctx: &egui::Context) {
        let Some(pending) = &self.pending_overwrite else {
            return;
        };
        let name = file_label(&pending.path);

        let mut replace = false;
        let mut cancel = false;
        egui::Window::new("Replace existing ReadMe?")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(format!("{} already exists in this folder.", name));
                ui.label("Replacing it discards its current contents.");
                ui.add_space(8.0);
                ui.horizontal(|ui| {
                    if ui.button("Replace").clicked() {
                        replace = true;
                    }
                    if ui.button("Cancel").clicked() {
                        cancel = true;
                    }
                });
            });

        if replace {
            self.confirm_overwrite();
        } else if cancel {
            self.cancel_overwrite();
        }
    }

    fn show_error_dialog(&mut self, ctx: &egui::Context) {
        let Some(message) = &self.error_dialog else {
            return;
        };
        let mut dismiss = false;
        egui::Window::new("⚠ Error")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.colored_label(self.theme_colors.error, message);
                ui.add_space(8.0);
                if ui.button("OK").clicked() {
                    dismiss = true;
                }
            });
        if dismiss {
            self.error_dialog = None;
        }
    }

    fn show_status_bar(&self, ctx: &egui::Context) {
        let tc = &self.theme_colors;
        let off_vocabulary = self.form.off_vocabulary();

        egui::TopBottomPanel::bottom("status_bar")
            .frame(egui::Frame::new()
                .fill(tc.status_bar_bg)
                .inner_margin(egui::Margin::symmetric(12, 4)))
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label(
                        egui::RichText::new(&self.status_message)
                            .size(11.5)
                            .color(tc.text_primary),
                    );
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        let rdm_color = match &self.rdm_status {
                            RdmStatus::Connected(_) => tc.success,
                            RdmStatus::Unavailable(_) => tc.warning,
                            RdmStatus::NotConfigured => tc.text_muted,
                        };
                        let rdm_icon = if self.rdm_status.is_connected() { "●" } else { "○" };
                        ui.colored_label(
                            rdm_color,
                            egui::RichText::new(format!("{} RDM", rdm_icon)).size(11.0),
                        )
                        .on_hover_text(self.rdm_status.label());

                        if let Some(format) = self.last_format {
                            ui.separator();
                            ui.label(
                                egui::RichText::new(format.label())
                                    .size(11.0)
                                    .color(tc.text_muted),
                            );
                        }

                        if !off_vocabulary.is_empty() {
                            ui.separator();
                            ui.colored_label(
                                tc.warning,
                                egui::RichText::new(format!("{} custom values", off_vocabulary.len()))
                                    .size(11.0),
                            )
                            .on_hover_text(off_vocabulary.join("\n"));
                        }
                    });
                });
            });
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

impl eframe::App for ReadmeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ── Re-apply theme and text size each frame ──
        theme::apply_theme(ctx, self.current_theme);
        theme::apply_font_size(ctx, self.font_size);

        // Handle drag-and-drop
        ctx.input(|i| {
            for file in &i.raw.dropped_files {
                if let Some(path) = &file.path {
                    self.dropped_files.push(path.clone());
                }
            }
        });

        // Process dropped files
        if let Some(path) = self.dropped_files.pop() {
            self.open_path(&path);
        }

        // ── Toolbar ──
        let toolbar_action = toolbar::show_toolbar(
            ctx,
            self.current_theme.label(),
            !self.templates.is_empty(),
        );
        if toolbar_action != ToolbarAction::None {
            self.handle_toolbar_action(toolbar_action);
        }

        // ── Status Bar ──
        self.show_status_bar(ctx);

        // ── Form ──
        let mut form_action = FormAction::None;
        egui::CentralPanel::default().show(ctx, |ui| {
            form_action = form_panel::show_form_panel(ui, &mut self.form, &self.theme_colors);
        });
        if form_action != FormAction::None {
            self.handle_form_action(form_action);
        }

        // ── Windows ──
        let template_action = template_dialog::show_template_dialog(ctx, &mut self.template_dialog_state);
        self.handle_template_action(template_action);

        metadata_panel::show_metadata_window(
            ctx,
            &mut self.metadata_state,
            self.form.extracted(),
            &self.unmapped,
            &self.theme_colors,
        );
        help::show_help_window(ctx, &mut self.show_help, &self.theme_colors);
        help::show_about_window(ctx, &mut self.show_about);
        self.show_overwrite_dialog(ctx);
        self.show_error_dialog(ctx);

        // Handle keyboard shortcuts
        let (open, save) = ctx.input(|i| {
            let command = i.modifiers.ctrl || i.modifiers.command;
            (
                command && i.key_pressed(egui::Key::O),
                command && i.key_pressed(egui::Key::S),
            )
        });
        if open {
            self.handle_toolbar_action(ToolbarAction::LoadImage);
        }
        if save {
            self.handle_toolbar_action(ToolbarAction::SaveReadme);
        }
    }
}
