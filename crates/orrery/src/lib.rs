//! Orrery: a session-scoped catalogue over a paginated remote listing.
//!
//! Pages fetched while browsing are ingested into a deduplicated
//! [`LocalIndex`]. An optional [`BackfillWalker`] follows the server's
//! cursor chain in the background so local search can cover the whole
//! collection. The [`Session`] actor ties browsing, paging and debounced
//! search together and publishes a [`ViewState`] after every change.

pub mod backfill;
pub mod cancel;
pub mod config;
pub mod index;
pub mod live;
pub mod pager;
pub mod search;
pub mod session;
pub mod sorting;

pub use backfill::{BackfillOutcome, BackfillStop, BackfillTrigger, BackfillWalker};
pub use config::{load_config, ConfigError, OrreryConfig, SessionConfig, SourceConfig};
pub use index::{IndexError, IngestReport, LocalIndex};
pub use live::{HttpTransport, LiveSource, ReqwestTransport};
pub use pager::Pager;
pub use search::{SearchBackend, SearchEngine};
pub use session::{Mode, PageDirection, Session, SessionError, SessionHandle, TotalPages, ViewState};
