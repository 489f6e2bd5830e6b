pub mod export_cell;
pub mod gallery;
pub mod notebook_runner;
pub mod publisher;
pub mod warn_writer;

pub use export_cell::{build_export_cell, parse_export_report, ExportOutcome};
pub use gallery::{generate_gallery, GalleryItem, GalleryReport};
pub use notebook_runner::{run_with_export, ExecutionOutput, NbConvertExecutor, NotebookExecutor};
pub use publisher::{archive_published, publish_notebook, PublishReport};
pub use warn_writer::WarnWriter;
