//! crates/burner_core/src/editor.rs
//!
//! State behind the caption editor: player controls, transcript panel and
//! style controls. The cue list is a local copy; edits only leave this
//! module through a `CueChangeObserver`.

use std::sync::Arc;

use tracing::debug;

use crate::domain::{CaptionColor, CaptionFont, CaptionPosition, CaptionStyle, Cue, PlaybackClock};
use crate::timeline::{active_cue, clamp_seek};

/// How far the skip buttons move the playhead, in seconds.
pub const SKIP_SECONDS: f64 = 5.0;

/// Receives the full cue list after the user saves an edit.
pub trait CueChangeObserver: Send + Sync {
    fn cues_changed(&self, cues: &[Cue]);
}

pub struct EditorState {
    cues: Vec<Cue>,
    clock: PlaybackClock,
    playing: bool,
    active_cue_id: Option<String>,
    transcript: String,
    style: CaptionStyle,
    observer: Option<Arc<dyn CueChangeObserver>>,
}

impl EditorState {
    pub fn new(cues: Vec<Cue>) -> Self {
        Self {
            cues,
            clock: PlaybackClock::default(),
            playing: false,
            active_cue_id: None,
            transcript: String::new(),
            style: CaptionStyle::default(),
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn CueChangeObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn cues(&self) -> &[Cue] {
        &self.cues
    }

    pub fn clock(&self) -> PlaybackClock {
        self.clock
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn active_cue_id(&self) -> Option<&str> {
        self.active_cue_id.as_deref()
    }

    /// The cue under the playhead right now, which drives the caption overlay.
    pub fn active_cue(&self) -> Option<&Cue> {
        active_cue(&self.cues, self.clock.current_time)
    }

    /// Text shown on the video for the current time, empty between cues.
    pub fn caption_text(&self) -> &str {
        self.active_cue().map(|c| c.text.as_str()).unwrap_or("")
    }

    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    pub fn style(&self) -> CaptionStyle {
        self.style
    }

    //=====================================================================================
    // Player Events
    //=====================================================================================

    /// The media element reported its duration.
    pub fn load_metadata(&mut self, duration: f64) {
        self.clock.duration = if duration.is_finite() { duration.max(0.0) } else { 0.0 };
        self.sync_active_cue();
    }

    /// The media element's clock advanced.
    pub fn time_update(&mut self, current_time: f64) {
        self.clock.current_time = current_time;
        self.sync_active_cue();
    }

    pub fn ended(&mut self) {
        self.playing = false;
    }

    pub fn toggle_play(&mut self) -> bool {
        self.playing = !self.playing;
        self.playing
    }

    /// Moves the playhead, clamped to the media bounds. Returns the applied time.
    pub fn seek(&mut self, time: f64) -> f64 {
        let target = clamp_seek(time, self.clock.duration);
        self.time_update(target);
        target
    }

    pub fn skip_backward(&mut self) -> f64 {
        self.seek(self.clock.current_time - SKIP_SECONDS)
    }

    pub fn skip_forward(&mut self) -> f64 {
        self.seek(self.clock.current_time + SKIP_SECONDS)
    }

    fn sync_active_cue(&mut self) {
        let found = active_cue(&self.cues, self.clock.current_time)
            .map(|cue| (cue.id.clone(), cue.text.clone()));
        match found {
            Some((id, text)) if self.active_cue_id.as_deref() != Some(id.as_str()) => {
                debug!("Active cue is now {}", id);
                self.active_cue_id = Some(id);
                self.transcript = text;
            }
            Some(_) => {}
            // Leaving a cue keeps whatever the transcript panel holds.
            None => self.active_cue_id = None,
        }
    }

    //=====================================================================================
    // Transcript Panel
    //=====================================================================================

    /// Jumps to a cue from the subtitle list.
    ///
    /// The transcript only takes the cue's text when the clamped seek actually
    /// lands in it; before metadata loads the playhead cannot leave zero.
    pub fn select_cue(&mut self, id: &str) -> bool {
        let Some((start, text)) = self
            .cues
            .iter()
            .find(|c| c.id == id)
            .map(|c| (c.start, c.text.clone()))
        else {
            return false;
        };
        self.seek(start);
        if self.active_cue_id.as_deref() == Some(id) {
            self.transcript = text;
        }
        true
    }

    pub fn edit_transcript(&mut self, text: impl Into<String>) {
        self.transcript = text.into();
    }

    pub fn can_save(&self) -> bool {
        self.active_cue_id.is_some()
    }

    /// Writes the transcript into the active cue and notifies the observer.
    ///
    /// Returns the updated list, or `None` when there is no active cue or the
    /// transcript is empty.
    pub fn save_changes(&mut self) -> Option<Vec<Cue>> {
        let active_id = self.active_cue_id.clone()?;
        if self.transcript.is_empty() {
            return None;
        }
        let cue = self.cues.iter_mut().find(|c| c.id == active_id)?;
        cue.text = self.transcript.clone();

        if let Some(observer) = &self.observer {
            observer.cues_changed(&self.cues);
        }
        Some(self.cues.clone())
    }

    //=====================================================================================
    // Style Controls
    //=====================================================================================

    pub fn set_font(&mut self, font: CaptionFont) {
        self.style.font = font;
    }

    pub fn set_color(&mut self, color: CaptionColor) {
        self.style.color = color;
    }

    pub fn set_position(&mut self, position: CaptionPosition) {
        self.style.position = position;
    }
}

/// Formats seconds as `MM:SS`, truncating fractions.
pub fn format_clock(seconds: f64) -> String {
    let whole = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{:02}:{:02}", whole / 60, whole % 60)
}
