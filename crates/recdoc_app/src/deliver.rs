use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use recdoc_engine::{AtomicFileWriter, PersistError, RunOutput};
use recdoc_logging::{engine_info, engine_warn};

/// Placeholders whose absence usually means the wrong template was picked.
const EXPECTED_PLACEHOLDERS: &[&str] = &["body", "metadata"];

/// Writes the filled document into `output_dir` and moves the run to done.
pub(crate) fn save_document(
    output_dir: &Path,
    output: &mut RunOutput,
) -> Result<PathBuf, PersistError> {
    let writer = AtomicFileWriter::new(output_dir.to_path_buf());
    let path = writer.write(&output.filename, &output.document.bytes)?;
    output.mark_delivered();
    engine_info!(
        "Wrote {} ({} bytes) to {:?}",
        output.filename,
        output.document.bytes.len(),
        writer.dir()
    );
    Ok(path)
}

pub(crate) fn missing_placeholders(found: &BTreeSet<String>) -> Vec<&'static str> {
    EXPECTED_PLACEHOLDERS
        .iter()
        .copied()
        .filter(|name| !found.contains(*name))
        .collect()
}

pub(crate) fn warn_missing_placeholders(found: &BTreeSet<String>) {
    for name in missing_placeholders(found) {
        engine_warn!(
            "Template has no {{{{{}}}}} placeholder; that section is left out",
            name
        );
    }
}
