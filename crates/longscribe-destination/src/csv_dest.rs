use crate::row::OutputRow;
use longscribe_core::{DestinationError, Segment};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Writes transcript rows to a CSV file, replacing any previous contents,
/// and echoes each row to a second writer as it goes.
pub struct CsvDestination {
    path: PathBuf,
}

impl CsvDestination {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the number of rows written.
    pub fn write_segments<W: Write>(
        &self,
        segments: &[Segment],
        echo: &mut W,
    ) -> Result<usize, DestinationError> {
        let path = self.path.display().to_string();
        let file = std::fs::File::create(&self.path)
            .map_err(|source| DestinationError::Create { path, source })?;
        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(file);

        writer
            .write_record(OutputRow::HEADER)
            .map_err(|e| DestinationError::WriteFailed(e.to_string()))?;

        let mut written = 0;
        for (index, segment) in segments.iter().enumerate() {
            let Some(row) = OutputRow::from_segment(segment) else {
                tracing::warn!(segment = index, "segment has no alternatives, skipping");
                continue;
            };
            writer
                .write_record([&row.timestamp, &row.confidence, &row.transcript])
                .map_err(|e| DestinationError::WriteFailed(e.to_string()))?;
            writeln!(echo, "{}", row.echo_line())
                .map_err(|e| DestinationError::WriteFailed(e.to_string()))?;
            written += 1;
        }

        writer
            .flush()
            .map_err(|e| DestinationError::WriteFailed(e.to_string()))?;

        tracing::info!(path = %self.path.display(), rows = written, "wrote transcript");
        Ok(written)
    }
}
