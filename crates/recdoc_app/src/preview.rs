use std::fmt::Write;

use recdoc_engine::Preview;

/// Sections shown by `--preview`, in print order.
const SECTIONS: &[(&str, &str)] = &[
    ("Title", "title"),
    ("Description", "description"),
    ("Body", "body"),
    ("Metadata", "metadata"),
];

/// Terminal rendering of an extraction preview. Empty sections print `(none)`.
pub(crate) fn format(preview: &Preview) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "URL: {}", preview.final_url);
    for (label, field) in SECTIONS {
        let value = preview.fields.get(field).unwrap_or_default();
        let _ = writeln!(out, "\n== {label} ==");
        if value.trim().is_empty() {
            out.push_str("(none)\n");
        } else {
            out.push_str(value);
            out.push('\n');
        }
    }
    out
}
