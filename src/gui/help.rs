/// Help / Info and About windows

use crate::data::readme::APP_NAME;
use crate::pipeline::templates::TEMPLATE_SUFFIX;

use super::theme::ThemeColors;

const SECTIONS: &[(&str, &[&str])] = &[
    (
        "✒ Entering information",
        &[
            "Not every field needs to be filled in.",
            "When the RDM gateway is reachable, RDM Info offers its project folders. Otherwise type the project in.",
            "Hover over a field name or text box for a description of the field.",
            "Fields with a ▾ list offer suggested values. Any other text is kept; choosing 'Other' is best explained in Notes.",
            "Notes take as much detail as you like. Timestamp starts a new line with the current date and time.",
        ],
    ),
    (
        "🔬 Image metadata",
        &[
            "Load Image Metadata reads the header of a Zeiss .czi, Leica .lif or Nikon .nd2 file.",
            "Microscope, objective, immersion, channels, Z-stack, time series and the acquisition date are filled in when the file records them. Other fields keep their values.",
            "Everything read from the file is saved below the form in the ReadMe and can be viewed under View → Extracted Metadata.",
            "Image files and ReadMe .txt files can also be dropped onto the window.",
        ],
    ),
    (
        "💾 Saving",
        &[
            "Save ReadMe writes <Project Name>_ReadMe.txt into the chosen folder, ideally the folder holding the raw data.",
            "Export JSON writes the same fields as <Project Name>_metadata.json.",
            "Existing files are only replaced after confirmation.",
        ],
    ),
    (
        "📂 Loading a ReadMe",
        &[
            "A previously saved ReadMe repopulates the form for quick edits, e.g. to add to Notes.",
            "Only lines whose key matches a form field are read; anything else is ignored.",
        ],
    ),
    (
        "📖 Templates",
        &[
            "Files named <something>_ReadME_template.txt in the template folder are offered at startup and under File → Templates.",
            "A template only prefills the form; the saved file is named after Project Name.",
        ],
    ),
    (
        "📌 Tips",
        &[
            "Use an earlier ReadMe as a template for fields that rarely change, such as RDM Info, names and sample information.",
            "When iterating on an experiment, number the project, e.g. exp1_v1, exp1_v2.",
            "Be descriptive: full names, reagent IDs, microscope configuration.",
        ],
    ),
];

pub fn show_help_window(ctx: &egui::Context, open: &mut bool, colors: &ThemeColors) {
    if !*open {
        return;
    }

    egui::Window::new("ℹ Help / Info")
        .open(open)
        .default_size([640.0, 480.0])
        .resizable(true)
        .show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.heading(format!("📄 {}", APP_NAME));
                ui.label("ReMInD: Recommended Metadata Interface for Documentation.");
                ui.label("Capture the metadata that belongs next to your raw microscopy data.");
                ui.add_space(8.0);

                for (title, lines) in SECTIONS {
                    ui.label(egui::RichText::new(*title).strong().color(colors.group_heading));
                    for line in *lines {
                        ui.horizontal_wrapped(|ui| {
                            ui.label("  •");
                            ui.label(*line);
                        });
                    }
                    ui.add_space(6.0);
                }

                ui.separator();
                ui.label(
                    egui::RichText::new(format!("Template files match *{} (any case).", TEMPLATE_SUFFIX))
                        .size(11.0)
                        .color(colors.text_muted),
                );
            });
        });
}

pub fn show_about_window(ctx: &egui::Context, open: &mut bool) {
    if !*open {
        return;
    }

    egui::Window::new("About")
        .open(open)
        .collapsible(false)
        .resizable(false)
        .show(ctx, |ui| {
            ui.heading(format!("🔬 {}", APP_NAME));
            ui.label(format!("Version {}", env!("CARGO_PKG_VERSION")));
            ui.add_space(10.0);
            ui.label("Built with Rust + egui");
            ui.add_space(10.0);
            ui.label("Features:");
            ui.label("• ReadMe form with suggested vocabularies");
            ui.label("• Zeiss CZI, Leica LIF and Nikon ND2 header import");
            ui.label("• Flat-text ReadMe and JSON export");
            ui.label("• Templates and RDM project lookup");
        });
}
