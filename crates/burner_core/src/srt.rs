//! crates/burner_core/src/srt.rs
//!
//! SubRip rendering of a cue list, the input format of the caption burner.

use std::fmt::Write;

use crate::domain::Cue;

/// Renders cues in list order, numbered from 1.
pub fn render_srt(cues: &[Cue]) -> String {
    let mut out = String::new();
    for (index, cue) in cues.iter().enumerate() {
        // Writing to a String cannot fail.
        let _ = write!(
            out,
            "{}\n{} --> {}\n{}\n\n",
            index + 1,
            srt_timestamp(cue.start),
            srt_timestamp(cue.end),
            cue.text.trim_end()
        );
    }
    out
}

/// `HH:MM:SS,mmm`, rounded to the nearest millisecond.
pub fn srt_timestamp(seconds: f64) -> String {
    let total_ms = if seconds.is_finite() && seconds > 0.0 {
        (seconds * 1000.0).round() as u64
    } else {
        0
    };
    let ms = total_ms % 1000;
    let total_s = total_ms / 1000;
    format!(
        "{:02}:{:02}:{:02},{:03}",
        total_s / 3600,
        (total_s % 3600) / 60,
        total_s % 60,
        ms
    )
}
