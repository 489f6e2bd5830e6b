pub mod logging;
pub mod text;

pub use logging::{LogBuffer, LogEntry, PanelLogLayer};
pub use text::{html_escape, truncate_text};
