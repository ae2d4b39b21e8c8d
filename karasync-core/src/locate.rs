//! Point-in-time lookup over a [`LyricTrack`].
//!
//! Maps a virtual-clock timestamp to the active line and to the sub-line
//! highlight progress the renderer needs.

use crate::lrc::{LyricLine, LyricTrack};

/// The active line for a given timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineMatch {
    pub index: usize,
    /// Elapsed time within the line, clamped to `[0, duration_ms]`
    pub elapsed_in_line_ms: u64,
}

/// The in-progress segment within a line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentProgress {
    pub index: usize,
    /// Fractional progress through the segment, in `[0.0, 1.0]`
    pub fraction: f32,
}

impl LyricTrack {
    /// Find the active line at `at_ms`: the last line whose start time is
    /// `<= at_ms`, index 0 before the first line, the last line (clamped)
    /// past the end. Returns `None` only for an empty track. O(log n).
    #[must_use]
    pub fn locate(&self, at_ms: u64) -> Option<LineMatch> {
        if self.lines.is_empty() {
            return None;
        }

        let upper = self.lines.partition_point(|line| line.start_time_ms <= at_ms);
        let index = upper.saturating_sub(1);
        let line = &self.lines[index];
        let elapsed_in_line_ms = at_ms
            .saturating_sub(line.start_time_ms)
            .min(line.duration_ms);

        Some(LineMatch {
            index,
            elapsed_in_line_ms,
        })
    }
}

impl LyricLine {
    /// Find the segment in progress at `elapsed_ms` within this line, and
    /// the fractional progress through it. Before the first segment the
    /// fraction is 0.0; past the last segment's end it is 1.0. Returns
    /// `None` when the line has no segments.
    #[must_use]
    pub fn segment_progress(&self, elapsed_ms: u64) -> Option<SegmentProgress> {
        if self.segments.is_empty() {
            return None;
        }

        let upper = self
            .segments
            .partition_point(|segment| u64::from(segment.start_offset_ms) <= elapsed_ms);
        let index = upper.saturating_sub(1);
        let segment = &self.segments[index];

        let offset = u64::from(segment.start_offset_ms);
        let duration = u64::from(segment.duration_ms);
        let fraction = if elapsed_ms <= offset {
            0.0
        } else if duration == 0 || elapsed_ms >= offset + duration {
            1.0
        } else {
            (elapsed_ms - offset) as f32 / duration as f32
        };

        Some(SegmentProgress { index, fraction })
    }
}
