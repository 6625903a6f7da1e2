use longscribe_core::{Offset, Segment};

/// One line of transcript output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRow {
    pub timestamp: String,
    pub confidence: String,
    pub transcript: String,
}

impl OutputRow {
    pub const HEADER: [&'static str; 3] = ["timestamp", "confidence", "transcript"];

    /// Build a row from a segment's top alternative. `None` if the segment
    /// has no alternatives.
    pub fn from_segment(segment: &Segment) -> Option<Self> {
        let best = segment.alternatives.first()?;
        let timestamp = best
            .words
            .first()
            .map(|w| format_timestamp(w.start_time))
            .unwrap_or_default();
        Some(Self {
            timestamp,
            confidence: format_confidence(best.confidence),
            transcript: best.transcript.clone(),
        })
    }

    pub fn echo_line(&self) -> String {
        format!(
            "{} | {} | {}",
            self.timestamp, self.confidence, self.transcript
        )
    }
}

/// `HH:MM:SS`, dropping any fraction of a second.
pub fn format_timestamp(offset: Offset) -> String {
    let total = offset.as_secs_f64().max(0.0).trunc() as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

pub fn format_confidence(confidence: f32) -> String {
    format!("{:.2}", confidence)
}
