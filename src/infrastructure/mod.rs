pub mod js_executor;

pub use js_executor::{ContentSize, JsExecutor};
