//! crates/burner_core/src/view.rs
//!
//! Ephemeral view flags. Never persisted; a fresh `ViewState` is the reset.

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Theme {
    Light,
    #[default]
    Dark,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    sidebar_open: bool,
    modal_content: Option<String>,
    theme: Theme,
    global_loading: bool,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_sidebar_open(&self) -> bool {
        self.sidebar_open
    }

    pub fn toggle_sidebar(&mut self) {
        self.sidebar_open = !self.sidebar_open;
    }

    pub fn set_sidebar_open(&mut self, open: bool) {
        self.sidebar_open = open;
    }

    pub fn is_modal_open(&self) -> bool {
        self.modal_content.is_some()
    }

    pub fn modal_content(&self) -> Option<&str> {
        self.modal_content.as_deref()
    }

    pub fn open_modal(&mut self, content: impl Into<String>) {
        self.modal_content = Some(content.into());
    }

    pub fn close_modal(&mut self) {
        self.modal_content = None;
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn toggle_theme(&mut self) {
        self.theme = match self.theme {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        };
    }

    pub fn is_loading(&self) -> bool {
        self.global_loading
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.global_loading = loading;
    }
}
