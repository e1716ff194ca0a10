//! Messages handled by the session actor.

use orrery_protocol::{Page, Record, SourceError};
use tokio::sync::oneshot;

pub(crate) type Responder = oneshot::Sender<()>;

/// Which paging fetch produced a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PageOp {
    First,
    Next,
}

pub(crate) enum Command {
    /// Replies once the first page is applied, or immediately if guarded.
    LoadFirstPage { respond: Responder },
    /// Replies once the next window is visible, or immediately if guarded.
    NextPage { respond: Responder },
    PrevPage { respond: Responder },
    /// Replies once the edit is registered. The search runs later.
    SetSearchTerm { text: String, respond: Responder },
    DismissError { respond: Responder },
    /// One-shot failure for the next local search.
    FailNextSearch { error: SourceError, respond: Responder },
    Shutdown { respond: Responder },

    // Posted by tasks the actor spawned.
    PageLoaded {
        op: PageOp,
        result: Result<Page, SourceError>,
    },
    SearchDue {
        generation: u64,
        term: String,
    },
    SearchFinished {
        generation: u64,
        result: Result<Vec<Record>, SourceError>,
    },
}

impl Command {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Command::LoadFirstPage { .. } => "load_first_page",
            Command::NextPage { .. } => "next_page",
            Command::PrevPage { .. } => "prev_page",
            Command::SetSearchTerm { .. } => "set_search_term",
            Command::DismissError { .. } => "dismiss_error",
            Command::FailNextSearch { .. } => "fail_next_search",
            Command::Shutdown { .. } => "shutdown",
            Command::PageLoaded { .. } => "page_loaded",
            Command::SearchDue { .. } => "search_due",
            Command::SearchFinished { .. } => "search_finished",
        }
    }
}
