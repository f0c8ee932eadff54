//! crates/burner_core/src/timeline.rs
//!
//! Maps between playback time and horizontal track position, and finds the
//! cue under the playhead.

use crate::domain::Cue;

/// Default horizontal scale of the timeline track.
pub const PIXELS_PER_SECOND: f64 = 100.0;

/// The track is never narrower than this, so short or not-yet-loaded media
/// still gets a scrollable canvas.
pub const MIN_TRACK_WIDTH: f64 = 2000.0;

/// A cue laid out on the track.
#[derive(Debug, Clone, PartialEq)]
pub struct CueBlock {
    pub id: String,
    pub left: f64,
    pub width: f64,
    pub active: bool,
}

/// A whole-second tick on the time ruler.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeMarker {
    pub second: u64,
    pub left: f64,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineScale {
    pixels_per_second: f64,
}

impl Default for TimelineScale {
    fn default() -> Self {
        Self {
            pixels_per_second: PIXELS_PER_SECOND,
        }
    }
}

impl TimelineScale {
    /// Returns `None` unless the scale is finite and strictly positive.
    pub fn new(pixels_per_second: f64) -> Option<Self> {
        (pixels_per_second.is_finite() && pixels_per_second > 0.0)
            .then_some(Self { pixels_per_second })
    }

    pub fn pixels_per_second(&self) -> f64 {
        self.pixels_per_second
    }

    pub fn time_to_pixel(&self, time: f64) -> f64 {
        time * self.pixels_per_second
    }

    pub fn pixel_to_time(&self, pixel: f64) -> f64 {
        pixel / self.pixels_per_second
    }

    pub fn track_width(&self, duration: f64) -> f64 {
        let computed = self.time_to_pixel(duration.max(0.0));
        if computed.is_nan() {
            return MIN_TRACK_WIDTH;
        }
        computed.max(MIN_TRACK_WIDTH)
    }

    /// Translates a click on the track into a seek target.
    ///
    /// `client_x` and `track_left` are in viewport coordinates; `scroll_left` is how
    /// far the track has been scrolled.
    pub fn seek_from_pointer(
        &self,
        client_x: f64,
        track_left: f64,
        scroll_left: f64,
        duration: f64,
    ) -> f64 {
        let offset = client_x - track_left + scroll_left;
        clamp_seek(self.pixel_to_time(offset), duration)
    }

    pub fn cue_block(&self, cue: &Cue, current_time: f64) -> CueBlock {
        CueBlock {
            id: cue.id.clone(),
            left: self.time_to_pixel(cue.start),
            width: self.time_to_pixel(cue.end - cue.start),
            active: is_active(cue, current_time),
        }
    }

    pub fn cue_blocks(&self, cues: &[Cue], current_time: f64) -> Vec<CueBlock> {
        cues.iter()
            .map(|cue| self.cue_block(cue, current_time))
            .collect()
    }

    /// Pixel offset of the playhead; hidden while playback sits at the origin.
    pub fn playhead(&self, current_time: f64) -> Option<f64> {
        (current_time > 0.0).then(|| self.time_to_pixel(current_time))
    }

    pub fn markers(&self, duration: f64) -> Vec<TimeMarker> {
        let last = if duration.is_finite() && duration > 0.0 {
            duration.ceil() as u64
        } else {
            0
        };
        (0..=last)
            .map(|second| TimeMarker {
                second,
                left: self.time_to_pixel(second as f64),
                label: format!("{}s", second),
            })
            .collect()
    }
}

/// Clamps a seek target to `[0, duration]`. NaN seeks to the start.
pub fn clamp_seek(time: f64, duration: f64) -> f64 {
    let upper = if duration.is_finite() { duration.max(0.0) } else { 0.0 };
    if time.is_nan() {
        return 0.0;
    }
    time.clamp(0.0, upper)
}

/// Whether `time` falls within the cue, bounds included.
pub fn is_active(cue: &Cue, time: f64) -> bool {
    time >= cue.start && time <= cue.end
}

/// The first cue in list order that contains `time`.
///
/// When cues overlap this picks the earliest listed one; see DESIGN.md.
pub fn active_cue(cues: &[Cue], time: f64) -> Option<&Cue> {
    cues.iter().find(|cue| is_active(cue, time))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cue(id: &str, start: f64, end: f64) -> Cue {
        Cue::new(id, start, end, id).unwrap()
    }

    #[test]
    fn active_cue_matches_example_cues() {
        let cues = vec![cue("A", 0.5, 2.5), cue("B", 3.0, 5.0)];
        assert!(active_cue(&cues, 2.6).is_none());
        assert_eq!(active_cue(&cues, 1.0).map(|c| c.id.as_str()), Some("A"));
        assert_eq!(active_cue(&cues, 3.0).map(|c| c.id.as_str()), Some("B"));
    }

    #[test]
    fn cue_bounds_are_inclusive() {
        let c = cue("A", 1.25, 4.75);
        assert!(is_active(&c, 1.25));
        assert!(is_active(&c, 4.75));
        assert!(!is_active(&c, 1.2499));
        assert!(!is_active(&c, 4.7501));
    }

    #[test]
    fn overlapping_cues_resolve_to_first_listed() {
        let cues = vec![cue("late", 2.0, 6.0), cue("early", 1.0, 3.0)];
        assert_eq!(active_cue(&cues, 2.5).map(|c| c.id.as_str()), Some("late"));
    }

    #[test]
    fn pixel_time_mapping_round_trips() {
        for scale in [1.0, 37.5, 100.0, 240.0] {
            let s = TimelineScale::new(scale).unwrap();
            for t in [0.0, 0.1, 2.5, 59.99, 3600.0] {
                let back = s.pixel_to_time(s.time_to_pixel(t));
                assert!((back - t).abs() < 1e-9, "scale {} time {}", scale, t);
            }
        }
    }

    #[test]
    fn scale_must_be_positive() {
        assert!(TimelineScale::new(0.0).is_none());
        assert!(TimelineScale::new(-1.0).is_none());
        assert!(TimelineScale::new(f64::INFINITY).is_none());
    }

    #[test]
    fn track_width_has_a_floor() {
        let s = TimelineScale::default();
        assert_eq!(s.track_width(5.0), 2000.0);
        assert_eq!(s.track_width(30.0), 3000.0);
        assert_eq!(s.track_width(0.0), 2000.0);
        assert_eq!(s.track_width(f64::NAN), 2000.0);
    }

    #[test]
    fn seeks_clamp_to_media_bounds() {
        assert_eq!(clamp_seek(-3.0, 10.0), 0.0);
        assert_eq!(clamp_seek(12.0, 10.0), 10.0);
        assert_eq!(clamp_seek(4.0, 10.0), 4.0);
        assert_eq!(clamp_seek(f64::NAN, 10.0), 0.0);
        assert_eq!(clamp_seek(4.0, f64::NAN), 0.0);
    }

    #[test]
    fn pointer_offset_accounts_for_scroll() {
        let s = TimelineScale::default();
        // 50px into a track that starts at 20px, scrolled by 300px.
        assert_eq!(s.seek_from_pointer(70.0, 20.0, 300.0, 30.0), 3.5);
        assert_eq!(s.seek_from_pointer(70.0, 20.0, 5000.0, 30.0), 30.0);
        assert_eq!(s.seek_from_pointer(10.0, 20.0, 0.0, 30.0), 0.0);
    }

    #[test]
    fn blocks_and_playhead_follow_the_scale() {
        let s = TimelineScale::default();
        let block = s.cue_block(&cue("A", 0.5, 2.5), 1.0);
        assert_eq!(block.left, 50.0);
        assert_eq!(block.width, 200.0);
        assert!(block.active);

        assert_eq!(s.playhead(0.0), None);
        assert_eq!(s.playhead(1.5), Some(150.0));
    }

    #[test]
    fn markers_cover_every_whole_second() {
        let s = TimelineScale::default();
        let markers = s.markers(2.2);
        assert_eq!(markers.len(), 4);
        assert_eq!(markers[3].label, "3s");
        assert_eq!(markers[3].left, 300.0);
        assert_eq!(s.markers(0.0).len(), 1);
    }
}
