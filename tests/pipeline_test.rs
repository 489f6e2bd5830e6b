mod common;

use common::{test_config, write_notebook, FakeCapturer, FakeExecutor};
use duckit::models::{ExportMarker, MarkerStatus, UNTITLED};
use duckit::{process_notebook, App, ProcessResult, VizLibrary};

#[tokio::test]
async fn test_existing_image_is_skipped_without_execution() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let notebook = write_notebook(&config.notebook_folder, "sales.ipynb", Some("Sales"));
    std::fs::write(notebook.with_extension("png"), b"old").unwrap();

    let executor = FakeExecutor::reporting("DUCKIT:EXPORTED plotly image\n");
    let capturer = FakeCapturer::default();

    let report = process_notebook(&notebook, &executor, &capturer, &config)
        .await
        .unwrap();

    assert_eq!(report.result, ProcessResult::Skipped);
    assert_eq!(executor.calls(), 0);
    // 图片保持原样
    assert_eq!(std::fs::read(notebook.with_extension("png")).unwrap(), b"old");
}

#[tokio::test]
async fn test_image_export_writes_marker() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let notebook = write_notebook(&config.notebook_folder, "sales.ipynb", Some("Sales"));

    let executor = FakeExecutor::reporting("DUCKIT:EXPORTED matplotlib image\n")
        .creating(notebook.with_extension("png"));
    let capturer = FakeCapturer::default();

    let report = process_notebook(&notebook, &executor, &capturer, &config)
        .await
        .unwrap();

    assert_eq!(report.result, ProcessResult::Exported(VizLibrary::Matplotlib));
    assert_eq!(report.image.as_deref(), Some(notebook.with_extension("png").as_path()));
    assert_eq!(capturer.calls(), 0);
    // 临时 notebook 已被清理
    assert!(!dir.path().join("temp_sales.ipynb").exists());

    let marker = ExportMarker::read_from(&notebook.with_extension("duckit.json")).unwrap();
    assert_eq!(marker.status, MarkerStatus::Exported);
    assert_eq!(marker.library, Some(VizLibrary::Matplotlib));
    assert!(!config.warn_file.exists());
}

#[tokio::test]
async fn test_html_export_is_captured_and_kept() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let notebook = write_notebook(&config.notebook_folder, "map.ipynb", Some("Map"));
    let html = notebook.with_extension("html");

    let executor = FakeExecutor::reporting("DUCKIT:EXPORTED folium html\n").creating(&html);
    let capturer = FakeCapturer::default();

    let report = process_notebook(&notebook, &executor, &capturer, &config)
        .await
        .unwrap();

    assert_eq!(report.result, ProcessResult::Exported(VizLibrary::Folium));
    assert_eq!(capturer.calls(), 1);
    assert!(notebook.with_extension("png").exists());
    assert!(html.exists(), "HTML 预览默认保留");
}

#[tokio::test]
async fn test_html_is_removed_when_not_kept() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.keep_html = false;
    let notebook = write_notebook(&config.notebook_folder, "map.ipynb", Some("Map"));
    let html = notebook.with_extension("html");

    let executor = FakeExecutor::reporting("DUCKIT:EXPORTED folium html\n").creating(&html);
    let capturer = FakeCapturer::default();

    let report = process_notebook(&notebook, &executor, &capturer, &config)
        .await
        .unwrap();

    assert_eq!(report.result, ProcessResult::Exported(VizLibrary::Folium));
    assert!(notebook.with_extension("png").exists());
    assert!(!html.exists());
}

#[tokio::test]
async fn test_capture_failure_keeps_html() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let notebook = write_notebook(&config.notebook_folder, "map.ipynb", Some("Map"));
    let html = notebook.with_extension("html");

    let executor = FakeExecutor::reporting("DUCKIT:EXPORTED folium html\n").creating(&html);
    let capturer = FakeCapturer::failing();

    let report = process_notebook(&notebook, &executor, &capturer, &config)
        .await
        .unwrap();

    assert!(matches!(report.result, ProcessResult::Failed(ref reason) if reason.contains("截图失败")));
    assert_eq!(capturer.calls(), 1);
    assert!(report.image.is_none());
    assert!(html.exists(), "截图失败时保留 HTML 供检查");

    let marker = ExportMarker::read_from(&notebook.with_extension("duckit.json")).unwrap();
    assert_eq!(marker.status, MarkerStatus::ExportError);
    assert_eq!(marker.html.as_deref(), Some(html.as_path()));

    let warnings = std::fs::read_to_string(&config.warn_file).unwrap();
    assert!(warnings.contains("| map.ipynb |"));
}

#[tokio::test]
async fn test_unsupported_type_warns() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let notebook = write_notebook(&config.notebook_folder, "table.ipynb", Some("Table"));

    let executor = FakeExecutor::reporting("DUCKIT:UNSUPPORTED pandas.core.frame.DataFrame\n");
    let capturer = FakeCapturer::default();

    let report = process_notebook(&notebook, &executor, &capturer, &config)
        .await
        .unwrap();

    assert!(
        matches!(report.result, ProcessResult::Warned(ref reason) if reason.contains("pandas.core.frame.DataFrame"))
    );
    assert_eq!(capturer.calls(), 0);

    let marker = ExportMarker::read_from(&notebook.with_extension("duckit.json")).unwrap();
    assert_eq!(marker.status, MarkerStatus::UnsupportedType);

    let warnings = std::fs::read_to_string(&config.warn_file).unwrap();
    assert_eq!(warnings.lines().count(), 1);
    assert!(warnings.contains("| table.ipynb |"));
}

#[tokio::test]
async fn test_missing_variable_warns_without_crashing() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let notebook = write_notebook(&config.notebook_folder, "empty.ipynb", None);

    let executor = FakeExecutor::reporting("DUCKIT:MISSING\n");
    let capturer = FakeCapturer::default();

    let report = process_notebook(&notebook, &executor, &capturer, &config)
        .await
        .unwrap();

    assert!(matches!(report.result, ProcessResult::Warned(ref reason) if reason.contains("dataviz")));
    assert!(report.image.is_none());

    let marker = ExportMarker::read_from(&notebook.with_extension("duckit.json")).unwrap();
    assert_eq!(marker.status, MarkerStatus::MissingVariable);

    let warnings = std::fs::read_to_string(&config.warn_file).unwrap();
    assert_eq!(warnings.lines().count(), 1);
    assert!(warnings.contains("| empty.ipynb |"));
}

#[tokio::test]
async fn test_failed_execution_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let notebook = write_notebook(&config.notebook_folder, "broken.ipynb", Some("Broken"));

    let mut executor = FakeExecutor::reporting("");
    executor.exit_code = 1;
    let capturer = FakeCapturer::default();

    let report = process_notebook(&notebook, &executor, &capturer, &config)
        .await
        .unwrap();

    assert!(matches!(report.result, ProcessResult::Failed(_)));
    assert!(!dir.path().join("temp_broken.ipynb").exists());
    let marker = ExportMarker::read_from(&notebook.with_extension("duckit.json")).unwrap();
    assert_eq!(marker.status, MarkerStatus::ExecutionFailed);
}

#[tokio::test]
async fn test_batch_run_continues_after_warnings() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let done = write_notebook(&config.notebook_folder, "a_done.ipynb", Some("Done"));
    std::fs::write(done.with_extension("png"), b"png").unwrap();
    write_notebook(&config.notebook_folder, "b_missing.ipynb", None);
    write_notebook(&config.notebook_folder, "temp_c.ipynb", None);

    let executor = FakeExecutor::reporting("DUCKIT:MISSING\n");
    let app = App::with_components(config, executor, FakeCapturer::default());

    let stats = app.run().await.unwrap();

    assert_eq!(stats.total, 2);
    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.warned, 1);
    assert_eq!(stats.failed, 0);
}

#[test]
fn test_title_placeholder_without_heading() {
    let dir = tempfile::tempdir().unwrap();
    let untitled = write_notebook(dir.path(), "untitled.ipynb", None);
    let titled = write_notebook(dir.path(), "titled.ipynb", Some("Population by Region"));

    assert_eq!(duckit::models::title_of(&untitled), UNTITLED);
    assert_eq!(duckit::models::title_of(&titled), "Population by Region");
}
