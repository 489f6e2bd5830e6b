pub mod notebook_loader;

pub use notebook_loader::{discover_notebooks, notebook_names};
