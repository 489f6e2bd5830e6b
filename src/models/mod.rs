pub mod artifact;
pub mod loaders;
pub mod marker;
pub mod notebook;

pub use artifact::{ArtifactPaths, ExportTarget, VizLibrary};
pub use loaders::{discover_notebooks, notebook_names};
pub use marker::{ExportMarker, MarkerStatus};
pub use notebook::{title_of, Cell, CellType, Notebook, UNTITLED};
