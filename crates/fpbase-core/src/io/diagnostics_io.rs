use std::io::Write;
use std::path::Path;

use crate::error::Result;
use crate::pipeline::BaselineDiagnostics;

/// Write run diagnostics as pretty-printed JSON. Non-finite numbers are
/// written as `null`.
pub fn write_diagnostics<W: Write>(writer: W, diagnostics: &BaselineDiagnostics) -> Result<()> {
    serde_json::to_writer_pretty(writer, diagnostics)?;
    Ok(())
}

pub fn write_diagnostics_path(path: &Path, diagnostics: &BaselineDiagnostics) -> Result<()> {
    let file = std::fs::File::create(path)?;
    let mut writer = std::io::BufWriter::new(file);
    write_diagnostics(&mut writer, diagnostics)?;
    writer.flush()?;
    Ok(())
}
