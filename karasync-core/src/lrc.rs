use crate::error::{CoreError, Result};

/// Placeholder duration for the final line until the media engine reports the
/// true track duration (see [`LyricTrack::set_total_duration`]).
const DEFAULT_LAST_LINE_DURATION_MS: u64 = 5000;

/// A sub-line highlight unit with timing relative to its line start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LyricSegment {
    pub text: String,
    /// Offset from the owning line's start time
    pub start_offset_ms: u32,
    pub duration_ms: u32,
}

/// A single timestamped line of lyrics.
#[derive(Debug, Clone)]
pub struct LyricLine {
    pub start_time_ms: u64,
    pub duration_ms: u64,
    pub text: String,
    /// Second-language text for bilingual display; empty when absent
    pub secondary_text: String,
    /// Time-contiguous, non-overlapping highlight segments covering the line
    pub segments: Vec<LyricSegment>,
}

impl LyricLine {
    /// End of this line on the track timeline.
    #[must_use]
    pub const fn end_time_ms(&self) -> u64 {
        self.start_time_ms.saturating_add(self.duration_ms)
    }
}

/// Parsed lyric track: lines ordered by strictly increasing start time.
///
/// Built once per song and replaced wholesale when a new song loads; never
/// mutated while being displayed, except for the late duration correction in
/// [`set_total_duration`](Self::set_total_duration) which is applied before
/// the track is handed to the display side.
#[derive(Debug, Clone, Default)]
pub struct LyricTrack {
    pub lines: Vec<LyricLine>,
    /// Total media duration; 0 until corrected from the engine's report
    pub total_duration_ms: u64,
}

impl LyricTrack {
    /// Parse line-oriented LRC text into a track.
    ///
    /// Each leading `[mm:ss.xx]` tag on a content line yields one line (a
    /// single content line may repeat under several tags). When
    /// `secondary_text` is given, its line at the same ordinal timestamp
    /// position is merged in for bilingual display; ordinals without a
    /// counterpart get empty secondary text. A tag that looks like a
    /// timestamp but fails to parse degrades that line to an untimed entry
    /// appended after the timed tail rather than aborting the parse.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::LrcParse`] only when the primary source contains
    /// no usable lyric content at all.
    pub fn parse(primary_text: &str, secondary_text: Option<&str>) -> Result<Self> {
        let primary = scan_source(primary_text);
        if primary.timed.is_empty() && primary.untimed.is_empty() {
            return Err(CoreError::LrcParse {
                reason: "no lyric content found".to_string(),
            });
        }

        let mut timed = primary.timed;
        timed.sort_by_key(|entry| entry.start_ms);
        timed.dedup_by_key(|entry| entry.start_ms);

        let secondary: Vec<String> = secondary_text
            .map(|text| {
                let mut entries = scan_source(text).timed;
                entries.sort_by_key(|entry| entry.start_ms);
                entries.dedup_by_key(|entry| entry.start_ms);
                entries.into_iter().map(|entry| entry.text).collect()
            })
            .unwrap_or_default();

        let mut lines: Vec<LyricLine> = timed
            .iter()
            .enumerate()
            .map(|(i, entry)| LyricLine {
                start_time_ms: entry.start_ms,
                duration_ms: 0,
                text: entry.text.clone(),
                secondary_text: secondary.get(i).cloned().unwrap_or_default(),
                segments: Vec::new(),
            })
            .collect();

        // Untimed entries (malformed tags) go after the timed tail, 1ms
        // apart, so line start times stay strictly increasing.
        let mut next_start = lines
            .last()
            .map_or(0, |line| line.start_time_ms.saturating_add(1));
        for text in primary.untimed {
            lines.push(LyricLine {
                start_time_ms: next_start,
                duration_ms: 0,
                text,
                secondary_text: String::new(),
                segments: Vec::new(),
            });
            next_start = next_start.saturating_add(1);
        }

        // Each line runs until the next one starts; the last gets a
        // placeholder until the true media duration is known.
        for i in 0..lines.len() {
            lines[i].duration_ms = match lines.get(i + 1) {
                Some(next) => next.start_time_ms.saturating_sub(lines[i].start_time_ms),
                None => DEFAULT_LAST_LINE_DURATION_MS,
            };
        }

        for (line, entry) in lines.iter_mut().zip(timed.iter()) {
            line.segments = build_segments(
                line.start_time_ms,
                line.duration_ms,
                &line.text,
                &entry.words,
            );
        }
        // Untimed tail lines carry a single full-line segment.
        for line in lines.iter_mut().skip(timed.len()) {
            line.segments = build_segments(line.start_time_ms, line.duration_ms, &line.text, &[]);
        }

        Ok(Self {
            lines,
            total_duration_ms: 0,
        })
    }

    /// Apply the engine-reported media duration, extending the final line so
    /// the highlight does not cut off abruptly. Idempotent; only the last
    /// line is affected.
    pub fn set_total_duration(&mut self, total_duration_ms: u64) {
        self.total_duration_ms = total_duration_ms;
        if let Some(last) = self.lines.last_mut() {
            if total_duration_ms > last.start_time_ms {
                last.duration_ms = total_duration_ms - last.start_time_ms;
                stretch_last_segment(last);
            }
        }
    }

    /// Whether any lyric lines were parsed.
    #[must_use]
    pub fn has_lines(&self) -> bool {
        !self.lines.is_empty()
    }
}

/// Raw scan result for one lyric source.
struct ScannedSource {
    timed: Vec<TimedEntry>,
    /// Content from lines whose timestamp tag was malformed, in source order
    untimed: Vec<String>,
}

struct TimedEntry {
    start_ms: u64,
    text: String,
    words: Vec<TimedWord>,
}

/// Word-level timing from enhanced LRC (`<mm:ss.xx>` tags), absolute times.
struct TimedWord {
    start_ms: u64,
    text: String,
}

fn scan_source(input: &str) -> ScannedSource {
    let mut timed = Vec::new();
    let mut untimed = Vec::new();

    for raw in input.lines() {
        let line = raw.trim();
        if line.is_empty() || !line.starts_with('[') {
            continue;
        }

        let mut timestamps = Vec::new();
        let mut remaining = line;
        let mut malformed = false;

        // Consume all leading [..] groups
        while remaining.starts_with('[') {
            let Some(end) = remaining.find(']') else {
                malformed = true;
                remaining = "";
                break;
            };
            let content = &remaining[1..end];
            if let Some(start_ms) = parse_timestamp(content) {
                timestamps.push(start_ms);
                remaining = &remaining[end + 1..];
            } else if content.starts_with(|c: char| c.is_ascii_digit()) {
                // Looks like a timestamp but does not parse as one: degrade
                // this line to an untimed entry instead of failing the parse
                malformed = true;
                remaining = &remaining[end + 1..];
                break;
            } else {
                // ID/metadata tag like [ti:..]; not lyric content
                break;
            }
        }

        let text = remaining.trim();
        if malformed {
            if !text.is_empty() {
                untimed.push(text.to_string());
            }
            continue;
        }
        if timestamps.is_empty() {
            continue;
        }

        let words = parse_enhanced_words(text);
        let plain_text = if words.is_empty() {
            text.to_string()
        } else {
            words
                .iter()
                .map(|word| word.text.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        };

        // A line may repeat under several timestamps
        for (i, start_ms) in timestamps.iter().enumerate() {
            timed.push(TimedEntry {
                start_ms: *start_ms,
                text: plain_text.clone(),
                words: if i == 0 {
                    words
                        .iter()
                        .map(|word| TimedWord {
                            start_ms: word.start_ms,
                            text: word.text.clone(),
                        })
                        .collect()
                } else {
                    // Word times are absolute and only meaningful for the
                    // first occurrence; repeats fall back to line-level timing
                    Vec::new()
                },
            });
        }
    }

    ScannedSource { timed, untimed }
}

/// Parse a timestamp like `01:23.45`, `01:23` or `01:23:45` (hundredths).
fn parse_timestamp(s: &str) -> Option<u64> {
    let parts: Vec<&str> = s.trim().split(':').collect();
    match parts.as_slice() {
        [minutes, seconds] => {
            let minutes: u64 = minutes.parse().ok()?;
            let (secs, millis) = parse_seconds(seconds)?;
            Some(minutes * 60_000 + secs * 1000 + millis)
        }
        [minutes, seconds, hundredths] => {
            let minutes: u64 = minutes.parse().ok()?;
            let secs: u64 = seconds.parse().ok()?;
            let hundredths: u64 = hundredths.parse().ok()?;
            Some(minutes * 60_000 + secs * 1000 + hundredths * 10)
        }
        _ => None,
    }
}

/// Split `ss.xx` into whole seconds and milliseconds.
fn parse_seconds(s: &str) -> Option<(u64, u64)> {
    match s.split_once('.') {
        Some((whole, frac)) => {
            if frac.is_empty() || !frac.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let secs: u64 = whole.parse().ok()?;
            let digits = &frac[..frac.len().min(3)];
            let mut millis: u64 = digits.parse().ok()?;
            for _ in digits.len()..3 {
                millis *= 10;
            }
            Some((secs, millis))
        }
        None => Some((s.parse().ok()?, 0)),
    }
}

/// Parse enhanced LRC word timing: `<mm:ss.xx> word <mm:ss.xx> word ...`.
/// Returns an empty vec when the line carries no word tags.
fn parse_enhanced_words(text: &str) -> Vec<TimedWord> {
    if !text.contains('<') {
        return Vec::new();
    }

    let mut words = Vec::new();
    let mut remaining = text.trim();

    while !remaining.is_empty() {
        let Some(open) = remaining.find('<') else {
            break;
        };
        remaining = &remaining[open + 1..];
        let Some(close) = remaining.find('>') else {
            break;
        };
        let tag = &remaining[..close];
        remaining = &remaining[close + 1..];

        let Some(start_ms) = parse_timestamp(tag) else {
            continue;
        };

        let span_end = remaining.find('<').unwrap_or(remaining.len());
        let span = remaining[..span_end].trim();
        if !span.is_empty() {
            words.push(TimedWord {
                start_ms,
                text: span.to_string(),
            });
        }
        remaining = &remaining[span_end..];
    }

    words
}

/// Build the highlight segments for one line.
///
/// Without word timing the whole line is a single segment. With word timing,
/// each timed span becomes a segment running until the next span (the last
/// until line end); a span holding several words is subdivided proportionally
/// by character count.
fn build_segments(
    line_start_ms: u64,
    line_duration_ms: u64,
    text: &str,
    words: &[TimedWord],
) -> Vec<LyricSegment> {
    if words.is_empty() {
        return vec![LyricSegment {
            text: text.to_string(),
            start_offset_ms: 0,
            duration_ms: clamp_u32(line_duration_ms),
        }];
    }

    let mut segments = Vec::new();
    for (i, word) in words.iter().enumerate() {
        let offset = word.start_ms.saturating_sub(line_start_ms).min(line_duration_ms);
        let end = words.get(i + 1).map_or(line_duration_ms, |next| {
            next.start_ms
                .saturating_sub(line_start_ms)
                .min(line_duration_ms)
        });
        let span_duration = end.saturating_sub(offset);
        split_span(&mut segments, &word.text, offset, span_duration);
    }
    segments
}

/// Append segments for one timed span, dividing its duration across its
/// whitespace-separated words proportionally by character count.
fn split_span(segments: &mut Vec<LyricSegment>, span: &str, offset_ms: u64, duration_ms: u64) {
    let parts: Vec<&str> = span.split_whitespace().collect();
    if parts.len() <= 1 {
        segments.push(LyricSegment {
            text: span.to_string(),
            start_offset_ms: clamp_u32(offset_ms),
            duration_ms: clamp_u32(duration_ms),
        });
        return;
    }

    let total_chars: u64 = parts.iter().map(|p| p.chars().count() as u64).sum();
    let mut consumed_chars: u64 = 0;
    let mut cursor = offset_ms;
    for (i, part) in parts.iter().enumerate() {
        consumed_chars += part.chars().count() as u64;
        let end = if i + 1 == parts.len() {
            offset_ms + duration_ms
        } else if total_chars == 0 {
            cursor
        } else {
            offset_ms + duration_ms * consumed_chars / total_chars
        };
        segments.push(LyricSegment {
            text: (*part).to_string(),
            start_offset_ms: clamp_u32(cursor),
            duration_ms: clamp_u32(end.saturating_sub(cursor)),
        });
        cursor = end;
    }
}

/// Extend the last segment so segments stay contiguous with the line end
/// after a late duration correction.
fn stretch_last_segment(line: &mut LyricLine) {
    if let Some(last) = line.segments.last_mut() {
        let offset = u64::from(last.start_offset_ms);
        if line.duration_ms > offset {
            last.duration_ms = clamp_u32(line.duration_ms - offset);
        }
    }
}

fn clamp_u32(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_two_lines_gap_duration() {
        let track = LyricTrack::parse("[00:01.00]hello\n[00:03.50]world", None).unwrap();
        assert_eq!(track.lines.len(), 2);
        assert_eq!(track.lines[0].start_time_ms, 1000);
        assert_eq!(track.lines[1].start_time_ms, 3500);
        assert_eq!(track.lines[0].duration_ms, 2500);
        assert_eq!(track.lines[0].text, "hello");
        assert_eq!(track.lines[1].text, "world");
    }

    #[test]
    fn test_parse_sorts_by_start_time() {
        let track = LyricTrack::parse("[00:10.00]second\n[00:05.00]first", None).unwrap();
        assert_eq!(track.lines[0].text, "first");
        assert_eq!(track.lines[1].text, "second");
        assert_eq!(track.lines[0].duration_ms, 5000);
    }

    #[test]
    fn test_parse_multi_timestamp_line() {
        let track = LyricTrack::parse("[00:05.00][00:15.00]Repeated lyric", None).unwrap();
        assert_eq!(track.lines.len(), 2);
        assert_eq!(track.lines[0].text, "Repeated lyric");
        assert_eq!(track.lines[1].text, "Repeated lyric");
        assert_eq!(track.lines[0].start_time_ms, 5000);
        assert_eq!(track.lines[1].start_time_ms, 15000);
    }

    #[test]
    fn test_parse_alternative_timestamp_format() {
        // Some LRC files use mm:ss:xx (colon instead of dot for hundredths)
        let track = LyricTrack::parse("[00:12:34]Hello world", None).unwrap();
        assert_eq!(track.lines[0].start_time_ms, 12340);
    }

    #[test]
    fn test_parse_malformed_tag_degrades_to_untimed() {
        let track =
            LyricTrack::parse("[00:05.00]First\n[00:0x.00]broken tag line\n[00:10.00]Second", None)
                .unwrap();
        assert_eq!(track.lines.len(), 3);
        // The degraded entry lands after the timed tail
        assert_eq!(track.lines[2].text, "broken tag line");
        assert_eq!(track.lines[2].start_time_ms, 10001);
    }

    #[test]
    fn test_parse_id_tags_ignored() {
        let input = "[ti:Song Title]\n[ar:Artist]\n[00:05.00]Lyrics here";
        let track = LyricTrack::parse(input, None).unwrap();
        assert_eq!(track.lines.len(), 1);
        assert_eq!(track.lines[0].text, "Lyrics here");
    }

    #[test]
    fn test_parse_empty_input_is_error() {
        assert!(LyricTrack::parse("", None).is_err());
        assert!(LyricTrack::parse("[ti:Only metadata]", None).is_err());
    }

    #[test]
    fn test_parse_cjk_lyrics() {
        let track = LyricTrack::parse("[00:05.00]你好世界", None).unwrap();
        assert_eq!(track.lines[0].text, "你好世界");
    }

    #[test]
    fn test_bilingual_merge_by_ordinal() {
        let primary = "[00:01.00]hello\n[00:03.00]world";
        let secondary = "[00:01.00]你好\n[00:03.00]世界";
        let track = LyricTrack::parse(primary, Some(secondary)).unwrap();
        assert_eq!(track.lines[0].secondary_text, "你好");
        assert_eq!(track.lines[1].secondary_text, "世界");
    }

    #[test]
    fn test_bilingual_merge_count_mismatch_is_not_an_error() {
        let primary = "[00:01.00]one\n[00:03.00]two\n[00:05.00]three";
        let secondary = "[00:01.00]uno";
        let track = LyricTrack::parse(primary, Some(secondary)).unwrap();
        assert_eq!(track.lines[0].secondary_text, "uno");
        assert_eq!(track.lines[1].secondary_text, "");
        assert_eq!(track.lines[2].secondary_text, "");
    }

    #[test]
    fn test_duplicate_timestamps_deduped() {
        let track = LyricTrack::parse("[00:01.00]first\n[00:01.00]shadowed", None).unwrap();
        assert_eq!(track.lines.len(), 1);
        let starts: Vec<u64> = track.lines.iter().map(|l| l.start_time_ms).collect();
        let mut sorted = starts.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(starts, sorted);
    }

    #[test]
    fn test_default_segment_spans_whole_line() {
        let track = LyricTrack::parse("[00:01.00]hello\n[00:03.50]world", None).unwrap();
        let line = &track.lines[0];
        assert_eq!(line.segments.len(), 1);
        assert_eq!(line.segments[0].text, "hello");
        assert_eq!(line.segments[0].start_offset_ms, 0);
        assert_eq!(u64::from(line.segments[0].duration_ms), line.duration_ms);
    }

    #[test]
    fn test_enhanced_words_become_segments() {
        let track =
            LyricTrack::parse("[00:10.00]<00:10.00>Hello <00:11.00>world\n[00:14.00]next", None)
                .unwrap();
        let line = &track.lines[0];
        assert_eq!(line.text, "Hello world");
        assert_eq!(line.segments.len(), 2);
        assert_eq!(line.segments[0].text, "Hello");
        assert_eq!(line.segments[0].start_offset_ms, 0);
        assert_eq!(line.segments[0].duration_ms, 1000);
        assert_eq!(line.segments[1].text, "world");
        assert_eq!(line.segments[1].start_offset_ms, 1000);
        // Runs until the line ends at the next line's start
        assert_eq!(line.segments[1].duration_ms, 3000);
    }

    #[test]
    fn test_multi_word_span_split_proportionally() {
        // One 4-char word and one 2-char word sharing a 3000ms span
        let track =
            LyricTrack::parse("[00:10.00]<00:10.00>aaaa bb\n[00:13.00]next", None).unwrap();
        let line = &track.lines[0];
        assert_eq!(line.segments.len(), 2);
        assert_eq!(line.segments[0].text, "aaaa");
        assert_eq!(line.segments[0].duration_ms, 2000);
        assert_eq!(line.segments[1].start_offset_ms, 2000);
        assert_eq!(line.segments[1].duration_ms, 1000);
    }

    #[test]
    fn test_set_total_duration_extends_last_line() {
        let mut track = LyricTrack::parse("[00:01.00]hello\n[00:03.50]world", None).unwrap();
        track.set_total_duration(10_000);
        assert_eq!(track.total_duration_ms, 10_000);
        assert_eq!(track.lines[1].duration_ms, 6500);
        assert_eq!(u64::from(track.lines[1].segments[0].duration_ms), 6500);
        // Idempotent: applying again changes nothing
        track.set_total_duration(10_000);
        assert_eq!(track.lines[1].duration_ms, 6500);
        // Only the last line is affected
        assert_eq!(track.lines[0].duration_ms, 2500);
    }

    #[test]
    fn test_set_total_duration_before_last_start_is_ignored_for_duration() {
        let mut track = LyricTrack::parse("[00:01.00]hello\n[00:03.50]world", None).unwrap();
        let before = track.lines[1].duration_ms;
        track.set_total_duration(2000);
        assert_eq!(track.lines[1].duration_ms, before);
    }

    #[test]
    fn test_segments_are_contiguous() {
        let track = LyricTrack::parse(
            "[00:10.00]<00:10.00>one <00:11.50>two three <00:13.00>four\n[00:15.00]next",
            None,
        )
        .unwrap();
        let line = &track.lines[0];
        let mut cursor = 0_u32;
        for segment in &line.segments {
            assert_eq!(segment.start_offset_ms, cursor);
            cursor += segment.duration_ms;
        }
        assert_eq!(u64::from(cursor), line.duration_ms);
    }
}
