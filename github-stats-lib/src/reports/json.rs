use super::OutputRecord;
use crate::Result;
use crate::stats::RepoStats;
use core::fmt::Write;

/// Write `stats` as a pretty-printed JSON array, one object per repository.
pub fn generate<W: Write>(stats: &[RepoStats], writer: &mut W) -> Result<()> {
    let records: Vec<OutputRecord<'_>> = stats.iter().map(OutputRecord::from).collect();
    writeln!(writer, "{}", serde_json::to_string_pretty(&records)?)?;
    Ok(())
}
