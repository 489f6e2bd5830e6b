//! 注入单元格 - 业务能力层
//!
//! 生成追加到 notebook 末尾的导出代码，并解析它在执行后留下的输出

use std::path::Path;

use crate::models::artifact::{ExportTarget, VizLibrary};
use crate::models::notebook::{Cell, CellType};

/// 注入单元格的识别标记（写在源码第一行）
pub const CELL_MARKER: &str = "# duckit: injected export cell";

/// 输出行前缀
const REPORT_PREFIX: &str = "DUCKIT:";

/// 导出逻辑本体，常量由 [`build_export_cell`] 在前面注入
const EXPORT_LOGIC: &str = r#"
import os
import sys


def _duckit_export():
    output_dir = os.path.dirname(DUCKIT_IMAGE_PATH)
    if output_dir:
        os.makedirs(output_dir, exist_ok=True)

    final_object = globals().get(DUCKIT_VARIABLE_NAME)
    if final_object is None:
        print(f"DUCKIT:MISSING {DUCKIT_VARIABLE_NAME}", file=sys.stderr)
        return

    object_type = str(type(final_object))

    if 'plotly.graph_objs._figure.Figure' in object_type:
        try:
            final_object.write_image(DUCKIT_IMAGE_PATH, scale=2, width=1200, height=800)
            print("DUCKIT:EXPORTED plotly image")
        except Exception as image_error:
            print(f"DUCKIT:NOTE write_image failed, using HTML ({image_error})", file=sys.stderr)
            final_object.write_html(DUCKIT_HTML_PATH, include_plotlyjs='cdn')
            print("DUCKIT:EXPORTED plotly html")
    elif 'matplotlib.figure.Figure' in object_type:
        final_object.savefig(DUCKIT_IMAGE_PATH, dpi=300, bbox_inches='tight')
        print("DUCKIT:EXPORTED matplotlib image")
    elif 'folium.folium.Map' in object_type:
        final_object.save(DUCKIT_HTML_PATH)
        print("DUCKIT:EXPORTED folium html")
    elif 'altair.vegalite' in object_type:
        final_object.save(DUCKIT_HTML_PATH)
        print("DUCKIT:EXPORTED altair html")
    elif 'bokeh.' in object_type and ('Figure' in object_type or 'figure' in object_type):
        from bokeh.io import save as bokeh_save
        from bokeh.resources import CDN
        bokeh_save(final_object, filename=DUCKIT_HTML_PATH, resources=CDN, title=DUCKIT_VARIABLE_NAME)
        print("DUCKIT:EXPORTED bokeh html")
    else:
        print(f"DUCKIT:UNSUPPORTED {object_type}", file=sys.stderr)


try:
    _duckit_export()
except Exception as e:
    print(f"DUCKIT:ERROR {e!r}", file=sys.stderr)
"#;

/// 注入单元格执行后的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// 成功导出
    Exported {
        library: VizLibrary,
        target: ExportTarget,
    },
    /// notebook 中没有约定的变量
    MissingVariable,
    /// 变量类型不受支持
    Unsupported(String),
    /// 导出过程抛出异常
    ExportError(String),
    /// 注入单元格没有留下任何结果（例如内核在它之前崩溃）
    NoReport,
}

impl ExportOutcome {
    pub fn is_warning(&self) -> bool {
        !matches!(self, ExportOutcome::Exported { .. })
    }
}

/// 构建注入单元格
pub fn build_export_cell(variable_name: &str, image_path: &Path, html_path: &Path) -> Cell {
    let header = format!(
        "{}\nDUCKIT_VARIABLE_NAME = {}\nDUCKIT_IMAGE_PATH = {}\nDUCKIT_HTML_PATH = {}\n",
        CELL_MARKER,
        py_string_literal(variable_name),
        py_string_literal(&image_path.to_string_lossy()),
        py_string_literal(&html_path.to_string_lossy()),
    );
    Cell::code(&format!("{}{}", header, EXPORT_LOGIC))
}

/// 判断单元格是否为注入的导出单元格
pub fn is_export_cell(cell: &Cell) -> bool {
    cell.cell_type == CellType::Code
        && cell
            .source
            .first()
            .is_some_and(|line| line.trim_end() == CELL_MARKER)
}

/// 生成 Python 双引号字符串字面量
pub fn py_string_literal(value: &str) -> String {
    let mut literal = String::with_capacity(value.len() + 2);
    literal.push('"');
    for ch in value.chars() {
        match ch {
            '\\' => literal.push_str("\\\\"),
            '"' => literal.push_str("\\\""),
            '\n' => literal.push_str("\\n"),
            '\r' => literal.push_str("\\r"),
            '\t' => literal.push_str("\\t"),
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                literal.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => literal.push(c),
        }
    }
    literal.push('"');
    literal
}

/// 从注入单元格的 stdout / stderr 中解析导出结果
///
/// 只看以 `DUCKIT:` 开头的行，后出现的结果覆盖先出现的
pub fn parse_export_report(stdout: &str, stderr: &str) -> ExportOutcome {
    let mut outcome = ExportOutcome::NoReport;

    for line in stdout.lines().chain(stderr.lines()) {
        let Some(rest) = line.trim().strip_prefix(REPORT_PREFIX) else {
            continue;
        };
        let (kind, detail) = rest.split_once(' ').unwrap_or((rest, ""));
        let detail = detail.trim();

        match kind {
            "EXPORTED" => {
                let mut parts = detail.split_whitespace();
                let library = parts.next().and_then(VizLibrary::parse);
                let target = match parts.next() {
                    Some("html") => ExportTarget::Html,
                    _ => ExportTarget::Image,
                };
                if let Some(library) = library {
                    outcome = ExportOutcome::Exported { library, target };
                }
            }
            "MISSING" => outcome = ExportOutcome::MissingVariable,
            "UNSUPPORTED" => outcome = ExportOutcome::Unsupported(detail.to_string()),
            "ERROR" => outcome = ExportOutcome::ExportError(detail.to_string()),
            _ => {}
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_py_string_literal_escapes() {
        assert_eq!(py_string_literal("plain"), "\"plain\"");
        assert_eq!(
            py_string_literal(r#"C:\data\"q".png"#),
            r#""C:\\data\\\"q\".png""#
        );
        assert_eq!(py_string_literal("a\nb\tc\u{1}"), "\"a\\nb\\tc\\x01\"");
        assert_eq!(py_string_literal("carte_été.png"), "\"carte_été.png\"");
    }

    #[test]
    fn test_build_export_cell() {
        let cell = build_export_cell(
            "dataviz",
            Path::new("notebooks/sales.png"),
            Path::new("notebooks/sales.html"),
        );
        let text = cell.text();

        assert!(is_export_cell(&cell));
        assert!(text.contains("DUCKIT_VARIABLE_NAME = \"dataviz\"\n"));
        assert!(text.contains("DUCKIT_IMAGE_PATH = \"notebooks/sales.png\"\n"));
        assert!(text.contains("DUCKIT_HTML_PATH = \"notebooks/sales.html\"\n"));
        assert!(text.contains("'folium.folium.Map' in object_type"));
        assert_eq!(cell.outputs.as_deref(), Some(&[][..]));
    }

    #[test]
    fn test_regular_cell_is_not_export_cell() {
        assert!(!is_export_cell(&Cell::code("x = 1\n")));
        assert!(!is_export_cell(&Cell::markdown(&format!("{}\n", CELL_MARKER))));
    }

    #[test]
    fn test_parse_exported() {
        let outcome = parse_export_report("DUCKIT:EXPORTED folium html\n", "");
        assert_eq!(
            outcome,
            ExportOutcome::Exported {
                library: VizLibrary::Folium,
                target: ExportTarget::Html,
            }
        );
    }

    #[test]
    fn test_parse_plotly_fallback_to_html() {
        let stderr = "DUCKIT:NOTE write_image failed, using HTML (kaleido missing)\n";
        let outcome = parse_export_report("DUCKIT:EXPORTED plotly html\n", stderr);
        assert_eq!(
            outcome,
            ExportOutcome::Exported {
                library: VizLibrary::Plotly,
                target: ExportTarget::Html,
            }
        );
    }

    #[test]
    fn test_parse_warnings() {
        assert_eq!(
            parse_export_report("", "DUCKIT:MISSING dataviz\n"),
            ExportOutcome::MissingVariable
        );
        assert_eq!(
            parse_export_report("", "DUCKIT:UNSUPPORTED <class 'pandas.core.frame.DataFrame'>\n"),
            ExportOutcome::Unsupported("<class 'pandas.core.frame.DataFrame'>".to_string())
        );
        assert_eq!(
            parse_export_report("", "DUCKIT:ERROR ValueError('bad')\n"),
            ExportOutcome::ExportError("ValueError('bad')".to_string())
        );
        assert_eq!(parse_export_report("hello\n", "noise\n"), ExportOutcome::NoReport);
        assert!(ExportOutcome::MissingVariable.is_warning());
    }
}
