use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::path::Path;
use tracing::error;

use crate::error::{AppError, AppResult, NotebookError};

/// 找不到标题时使用的默认标题
pub const UNTITLED: &str = "Untitled Report";

/// notebook 文档（nbformat 4）
///
/// 只关心 `cells`，其他顶层字段原样保留
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notebook {
    #[serde(default)]
    pub cells: Vec<Cell>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

/// notebook 单元格
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cell {
    pub cell_type: CellType,
    #[serde(deserialize_with = "deserialize_source")]
    pub source: Vec<String>,
    #[serde(default)]
    pub metadata: Map<String, JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Vec<JsonValue>>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellType {
    Markdown,
    Code,
    Raw,
}

impl Cell {
    /// 创建空输出的代码单元格，source 按行拆分（保留换行符）
    pub fn code(source: &str) -> Self {
        let mut extra = Map::new();
        extra.insert("execution_count".to_string(), JsonValue::Null);
        Self {
            cell_type: CellType::Code,
            source: split_lines(source),
            metadata: Map::new(),
            outputs: Some(Vec::new()),
            extra,
        }
    }

    pub fn markdown(source: &str) -> Self {
        Self {
            cell_type: CellType::Markdown,
            source: split_lines(source),
            metadata: Map::new(),
            outputs: None,
            extra: Map::new(),
        }
    }

    /// 完整源码文本
    pub fn text(&self) -> String {
        self.source.concat()
    }

    /// 指定流（stdout / stderr）的全部输出文本
    pub fn stream_text(&self, stream: &str) -> String {
        let mut text = String::new();
        for output in self.outputs.iter().flatten() {
            if output.get("output_type").and_then(|v| v.as_str()) != Some("stream") {
                continue;
            }
            if output.get("name").and_then(|v| v.as_str()) != Some(stream) {
                continue;
            }
            match output.get("text") {
                Some(JsonValue::String(s)) => text.push_str(s),
                Some(JsonValue::Array(lines)) => {
                    for line in lines.iter().filter_map(|l| l.as_str()) {
                        text.push_str(line);
                    }
                }
                _ => {}
            }
        }
        text
    }

    /// 单元格中第一行以 `#` 开头的标题（去掉 `#` 与空白）
    fn heading(&self) -> Option<String> {
        self.text()
            .lines()
            .map(str::trim)
            .find(|line| line.starts_with('#'))
            .map(|line| line.trim_start_matches('#').trim().to_string())
    }
}

impl Notebook {
    pub fn parse(content: &str) -> AppResult<Self> {
        serde_json::from_str(content).map_err(|source| {
            NotebookError::ParseFailed {
                path: String::new(),
                source,
            }
            .into()
        })
    }

    /// 从文件加载 notebook
    pub fn from_path(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
        serde_json::from_str(&content).map_err(|source| {
            NotebookError::ParseFailed {
                path: path.display().to_string(),
                source,
            }
            .into()
        })
    }

    /// 写入文件
    pub fn write_to(&self, path: &Path) -> AppResult<()> {
        let content = serde_json::to_string(self).map_err(|source| NotebookError::SerializeFailed {
            path: path.display().to_string(),
            source,
        })?;
        std::fs::write(path, content)
            .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))
    }

    pub fn push_cell(&mut self, cell: Cell) {
        self.cells.push(cell);
    }

    /// 报告标题：第一个含标题行的 markdown 单元格
    pub fn title(&self) -> String {
        self.cells
            .iter()
            .filter(|cell| cell.cell_type == CellType::Markdown)
            .find_map(Cell::heading)
            .unwrap_or_else(|| UNTITLED.to_string())
    }
}

/// 读取 notebook 标题，读取或解析失败时返回默认标题
pub fn title_of(path: &Path) -> String {
    match Notebook::from_path(path) {
        Ok(notebook) => notebook.title(),
        Err(e) => {
            error!("读取或解析 {} 失败: {}", path.display(), e);
            UNTITLED.to_string()
        }
    }
}

fn split_lines(source: &str) -> Vec<String> {
    source.split_inclusive('\n').map(str::to_string).collect()
}

// source 字段既可能是字符串也可能是字符串数组
fn deserialize_source<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{SeqAccess, Visitor};
    use std::fmt;

    struct SourceVisitor;

    impl<'de> Visitor<'de> for SourceVisitor {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or a list of strings")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(split_lines(value))
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: SeqAccess<'de>,
        {
            let mut lines = Vec::new();
            while let Some(line) = seq.next_element::<String>()? {
                lines.push(line);
            }
            Ok(lines)
        }
    }

    deserializer.deserialize_any(SourceVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notebook(cells: JsonValue) -> Notebook {
        let doc = serde_json::json!({
            "cells": cells,
            "metadata": {"kernelspec": {"name": "python3"}},
            "nbformat": 4,
            "nbformat_minor": 5
        });
        Notebook::parse(&doc.to_string()).unwrap()
    }

    #[test]
    fn test_title_from_first_markdown_heading() {
        let nb = notebook(serde_json::json!([
            {"cell_type": "code", "source": ["# not a title\n"], "metadata": {}, "outputs": [], "execution_count": null},
            {"cell_type": "markdown", "source": ["Some intro\n", "  ## Ventes par région  \n"], "metadata": {}},
            {"cell_type": "markdown", "source": "# Later heading", "metadata": {}}
        ]));
        assert_eq!(nb.title(), "Ventes par région");
    }

    #[test]
    fn test_title_skips_markdown_without_heading() {
        let nb = notebook(serde_json::json!([
            {"cell_type": "markdown", "source": "just text", "metadata": {}},
            {"cell_type": "markdown", "source": "intro\n# Real title\n", "metadata": {}}
        ]));
        assert_eq!(nb.title(), "Real title");
    }

    #[test]
    fn test_title_placeholder_without_heading() {
        let nb = notebook(serde_json::json!([
            {"cell_type": "markdown", "source": ["no heading here\n"], "metadata": {}},
            {"cell_type": "code", "source": "# comment", "metadata": {}, "outputs": [], "execution_count": 1}
        ]));
        assert_eq!(nb.title(), UNTITLED);
    }

    #[test]
    fn test_title_of_unreadable_file_is_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.ipynb");
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(title_of(&path), UNTITLED);
    }

    #[test]
    fn test_unknown_fields_are_preserved() {
        let mut nb = notebook(serde_json::json!([
            {"cell_type": "code", "id": "abc", "source": "x = 1", "metadata": {"tags": []}, "outputs": [], "execution_count": null}
        ]));
        nb.push_cell(Cell::code("print('hi')\nprint('bye')\n"));

        let value: JsonValue = serde_json::to_value(&nb).unwrap();
        assert_eq!(value["nbformat"], 4);
        assert_eq!(value["metadata"]["kernelspec"]["name"], "python3");
        assert_eq!(value["cells"][0]["id"], "abc");
        assert_eq!(value["cells"][1]["source"][1], "print('bye')\n");
        assert!(value["cells"][1]
            .as_object()
            .unwrap()
            .get("execution_count")
            .is_some_and(JsonValue::is_null));
        assert_eq!(value["cells"][1]["outputs"], serde_json::json!([]));
    }

    #[test]
    fn test_stream_text_joins_outputs() {
        let nb = notebook(serde_json::json!([
            {"cell_type": "code", "source": "", "metadata": {}, "execution_count": 3, "outputs": [
                {"output_type": "stream", "name": "stdout", "text": ["a\n", "b\n"]},
                {"output_type": "stream", "name": "stderr", "text": "oops\n"},
                {"output_type": "execute_result", "data": {}, "metadata": {}, "execution_count": 3}
            ]}
        ]));
        assert_eq!(nb.cells[0].stream_text("stdout"), "a\nb\n");
        assert_eq!(nb.cells[0].stream_text("stderr"), "oops\n");
    }
}
