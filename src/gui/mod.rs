pub mod form_panel;
pub mod help;
pub mod metadata_panel;
pub mod template_dialog;
pub mod theme;
pub mod toolbar;
