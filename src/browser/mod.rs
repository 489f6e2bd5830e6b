pub mod capture;
pub mod headless;

pub use capture::{capture_html, CaptureReport, Capturer, ChromeCapturer};
pub use headless::{launch_headless_browser, HeadlessBrowser};
