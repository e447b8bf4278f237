//! Chatmark engine: DOM parsing, history recovery and artifact persistence.
mod convert;
mod decode;
mod export;
mod loader;
mod page;
mod persist;
mod platform;
mod types;

pub use convert::{DomMessageConverter, MessageConverter};
pub use decode::{decode_snapshot, DecodeError, DecodedSnapshot};
pub use export::{ExportSettings, ExportSummary, Exporter};
pub use loader::{HistoryLoader, RecoveryReport};
pub use page::{PageDriver, ReplayPage, ScrollRegion};
pub use persist::{ensure_output_dir, ArtifactWriter, PersistError};
pub use platform::{Platform, PlatformProfile, RoleRule};
pub use types::{
    ChannelProgressSink, ExportError, ExportEvent, ExportProgress, NullProgressSink, PageError,
    ProgressSink, Stage,
};
