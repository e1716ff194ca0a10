//! Observable session state.

use orrery_protocol::Record;
use std::fmt;

/// Which surface the visible window belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Browsing,
    Searching,
}

/// Direction of the last page turn. Presentation only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageDirection {
    #[default]
    Forward,
    Backward,
}

/// Page count as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TotalPages {
    /// The server still reports a cursor, so the collection is open-ended.
    Unknown,
    Known(usize),
}

impl fmt::Display for TotalPages {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TotalPages::Unknown => write!(f, "?"),
            TotalPages::Known(n) => write!(f, "{}", n),
        }
    }
}

/// Everything a front end renders. A fresh value is published after every
/// state change.
///
/// A page turn already in flight when a search starts still lands: the
/// browsing snapshot grows and `current_page` advances, while `visible`
/// keeps the search results. Clearing the search then shows the page the
/// turn advanced to, not the one on screen when the search began.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    /// Current window: a page of the browsing snapshot, or search results.
    pub visible: Vec<Record>,
    /// A paging fetch or a search is outstanding.
    pub loading: bool,
    /// Last user-facing error, until dismissed.
    pub error: Option<String>,
    pub mode: Mode,
    /// Zero-based.
    pub current_page: usize,
    pub total_pages: TotalPages,
    pub has_server_paging: bool,
    pub can_load_more: bool,
    pub page_direction: PageDirection,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            visible: Vec::new(),
            loading: false,
            error: None,
            mode: Mode::Browsing,
            current_page: 0,
            total_pages: TotalPages::Known(1),
            has_server_paging: false,
            can_load_more: false,
            page_direction: PageDirection::Forward,
        }
    }
}

impl ViewState {
    /// One-based page number.
    pub fn current_page_display(&self) -> usize {
        self.current_page + 1
    }

    /// "2 / ?" style indicator.
    pub fn page_indicator(&self) -> String {
        format!("{} / {}", self.current_page_display(), self.total_pages)
    }

    pub fn visible_names(&self) -> Vec<&str> {
        self.visible.iter().map(|r| r.name.as_str()).collect()
    }
}
