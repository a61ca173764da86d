/// Light and dark themes plus font scaling

/// Available themes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppTheme {
    #[default]
    Light,
    Dark,
}

impl AppTheme {
    pub fn label(&self) -> &'static str {
        match self {
            AppTheme::Light => "☀ Light",
            AppTheme::Dark => "🌙 Dark",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            AppTheme::Light => AppTheme::Dark,
            AppTheme::Dark => AppTheme::Light,
        }
    }
}

pub const MIN_FONT_SIZE: f32 = 9.0;
pub const MAX_FONT_SIZE: f32 = 24.0;
pub const DEFAULT_FONT_SIZE: f32 = 13.0;

/// Colors the form and status bar draw with
#[derive(Debug, Clone)]
pub struct ThemeColors {
    pub panel_fill: egui::Color32,
    pub window_fill: egui::Color32,
    pub faint_bg: egui::Color32,

    pub widget_bg: egui::Color32,
    pub widget_stroke: egui::Color32,
    pub widget_hovered_stroke: egui::Color32,
    pub widget_active_bg: egui::Color32,

    pub selection_bg: egui::Color32,
    pub selection_stroke: egui::Color32,

    pub text_primary: egui::Color32,
    pub text_muted: egui::Color32,
    pub group_heading: egui::Color32,

    pub success: egui::Color32,
    pub warning: egui::Color32,
    pub error: egui::Color32,

    pub status_bar_bg: egui::Color32,
    pub shadow_color: egui::Color32,

    pub is_dark: bool,
}

impl ThemeColors {
    pub fn from_theme(theme: AppTheme) -> Self {
        match theme {
            AppTheme::Light => Self::light(),
            AppTheme::Dark => Self::dark(),
        }
    }

    fn light() -> Self {
        Self {
            panel_fill: egui::Color32::from_rgb(0xF6, 0xF7, 0xF9),
            window_fill: egui::Color32::WHITE,
            faint_bg: egui::Color32::from_rgb(0xEE, 0xF0, 0xF4),

            widget_bg: egui::Color32::from_rgb(0xFF, 0xFF, 0xFF),
            widget_stroke: egui::Color32::from_rgb(0xC5, 0xCA, 0xD3),
            widget_hovered_stroke: egui::Color32::from_rgb(0x4A, 0x7F, 0xB5),
            widget_active_bg: egui::Color32::from_rgb(0x2F, 0x6B, 0xA8),

            selection_bg: egui::Color32::from_rgba_premultiplied(0x2F, 0x6B, 0xA8, 0x40),
            selection_stroke: egui::Color32::from_rgb(0x2F, 0x6B, 0xA8),

            text_primary: egui::Color32::from_rgb(0x22, 0x26, 0x2E),
            text_muted: egui::Color32::from_rgb(0x7A, 0x80, 0x8A),
            group_heading: egui::Color32::from_rgb(0x2F, 0x6B, 0xA8),

            success: egui::Color32::from_rgb(0x1F, 0x8A, 0x46),
            warning: egui::Color32::from_rgb(0xB0, 0x7A, 0x00),
            error: egui::Color32::from_rgb(0xC8, 0x2C, 0x2C),

            status_bar_bg: egui::Color32::from_rgb(0xEA, 0xEC, 0xF0),
            shadow_color: egui::Color32::from_rgba_premultiplied(0, 0, 0, 25),

            is_dark: false,
        }
    }

    fn dark() -> Self {
        Self {
            panel_fill: egui::Color32::from_rgb(0x1C, 0x1E, 0x24),
            window_fill: egui::Color32::from_rgb(0x23, 0x26, 0x2D),
            faint_bg: egui::Color32::from_rgb(0x26, 0x29, 0x31),

            widget_bg: egui::Color32::from_rgb(0x2B, 0x2F, 0x38),
            widget_stroke: egui::Color32::from_rgb(0x44, 0x4A, 0x56),
            widget_hovered_stroke: egui::Color32::from_rgb(0x6F, 0xA8, 0xDC),
            widget_active_bg: egui::Color32::from_rgb(0x3D, 0x7E, 0xC0),

            selection_bg: egui::Color32::from_rgba_premultiplied(0x3D, 0x7E, 0xC0, 0x50),
            selection_stroke: egui::Color32::from_rgb(0x6F, 0xA8, 0xDC),

            text_primary: egui::Color32::from_rgb(0xDD, 0xE1, 0xE8),
            text_muted: egui::Color32::from_rgb(0x8A, 0x90, 0x9C),
            group_heading: egui::Color32::from_rgb(0x6F, 0xA8, 0xDC),

            success: egui::Color32::from_rgb(0x4C, 0xC3, 0x7A),
            warning: egui::Color32::from_rgb(0xE6, 0xB4, 0x3C),
            error: egui::Color32::from_rgb(0xF0, 0x5A, 0x5A),

            status_bar_bg: egui::Color32::from_rgb(0x17, 0x19, 0x1E),
            shadow_color: egui::Color32::from_rgba_premultiplied(0, 0, 0, 60),

            is_dark: true,
        }
    }
}

/// Apply a theme to the egui context
pub fn apply_theme(ctx: &egui::Context, theme: AppTheme) {
    let c = ThemeColors::from_theme(theme);

    let mut visuals = if c.is_dark {
        egui::Visuals::dark()
    } else {
        egui::Visuals::light()
    };

    visuals.panel_fill = c.panel_fill;
    visuals.window_fill = c.window_fill;
    visuals.faint_bg_color = c.faint_bg;
    visuals.extreme_bg_color = c.widget_bg;
    visuals.override_text_color = Some(c.text_primary);

    visuals.widgets.noninteractive.bg_stroke = egui::Stroke::new(0.5, c.widget_stroke);
    visuals.widgets.inactive.bg_stroke = egui::Stroke::new(0.5, c.widget_stroke);
    visuals.widgets.inactive.corner_radius = egui::CornerRadius::same(4);
    visuals.widgets.hovered.bg_stroke = egui::Stroke::new(1.0, c.widget_hovered_stroke);
    visuals.widgets.active.bg_fill = c.widget_active_bg;

    visuals.selection.bg_fill = c.selection_bg;
    visuals.selection.stroke = egui::Stroke::new(1.0, c.selection_stroke);

    visuals.window_shadow = egui::epaint::Shadow {
        offset: [0, 2],
        blur: 10,
        spread: 0,
        color: c.shadow_color,
    };

    ctx.set_visuals(visuals);
}

/// Scale every text style relative to the body size.
pub fn apply_font_size(ctx: &egui::Context, body: f32) {
    let body = body.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
    ctx.style_mut(|style| {
        for (text_style, font_id) in style.text_styles.iter_mut() {
            font_id.size = match text_style {
                egui::TextStyle::Heading => body * 1.4,
                egui::TextStyle::Small => body * 0.8,
                egui::TextStyle::Monospace => body * 0.95,
                _ => body,
            };
        }
    });
}
