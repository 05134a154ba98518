use crate::tls::CertificateRecord;
use anyhow::{Context, Result};
use std::io::Write;

/// Sort records by domain name, keeping input order between equal names
pub fn sort_records(records: &mut [CertificateRecord]) {
    records.sort_by(|a, b| a.domain_name.cmp(&b.domain_name));
}

/// Write records as an indented JSON array followed by a newline
///
/// # Errors
///
/// Returns an error if serialization or the write fails
pub fn write_json<W: Write>(mut writer: W, records: &[CertificateRecord]) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, records).context("failed to encode records")?;
    writeln!(writer).context("failed to write output")?;
    writer.flush().context("failed to flush output")?;
    Ok(())
}
