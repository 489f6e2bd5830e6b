use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{AppResult, NotebookError};

/// 标记文件后缀
pub const MARKER_SUFFIX: &str = "duckit.json";

/// 临时文件前缀，扫描 notebook 时会跳过
pub const TEMP_PREFIXES: [&str; 2] = ["temp_", "_temp_"];

/// 单个 notebook 对应的产物路径
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub notebook: PathBuf,
    pub stem: String,
    pub image: PathBuf,
    pub html: PathBuf,
    pub marker: PathBuf,
    pub temp_notebook: PathBuf,
}

impl ArtifactPaths {
    /// 根据 notebook 路径推导所有产物路径
    ///
    /// 图片、HTML 与标记文件和 notebook 放在一起，临时 notebook 放在 `scratch` 目录
    pub fn for_notebook(notebook: &Path, scratch: &Path) -> AppResult<Self> {
        let stem = notebook
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| NotebookError::InvalidName {
                name: notebook.display().to_string(),
            })?
            .to_string();

        Ok(Self {
            notebook: notebook.to_path_buf(),
            image: notebook.with_extension("png"),
            html: notebook.with_extension("html"),
            marker: notebook.with_extension(MARKER_SUFFIX),
            temp_notebook: scratch.join(format!("temp_{}.ipynb", stem)),
            stem,
        })
    }

    pub fn image_exists(&self) -> bool {
        self.image.exists()
    }
}

/// 支持导出的可视化库
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VizLibrary {
    Plotly,
    Matplotlib,
    Folium,
    Altair,
    Bokeh,
}

impl VizLibrary {
    pub const ALL: [VizLibrary; 5] = [
        VizLibrary::Plotly,
        VizLibrary::Matplotlib,
        VizLibrary::Folium,
        VizLibrary::Altair,
        VizLibrary::Bokeh,
    ];

    /// 根据 Python 类型名（`str(type(obj))`）判断库
    pub fn from_type_name(type_name: &str) -> Option<Self> {
        if type_name.contains("plotly.graph_objs._figure.Figure") {
            Some(VizLibrary::Plotly)
        } else if type_name.contains("matplotlib.figure.Figure") {
            Some(VizLibrary::Matplotlib)
        } else if type_name.contains("folium.folium.Map") {
            Some(VizLibrary::Folium)
        } else if type_name.contains("altair.vegalite") {
            Some(VizLibrary::Altair)
        } else if type_name.contains("bokeh.")
            && (type_name.contains("Figure") || type_name.contains("figure"))
        {
            Some(VizLibrary::Bokeh)
        } else {
            None
        }
    }

    /// 根据 HTML 文件开头的内容判断库
    pub fn sniff_html(head: &str) -> Option<Self> {
        let head = head.to_ascii_lowercase();
        if head.contains("leaflet") {
            Some(VizLibrary::Folium)
        } else if head.contains("plotly") {
            Some(VizLibrary::Plotly)
        } else if head.contains("vega") {
            Some(VizLibrary::Altair)
        } else if head.contains("bokeh") {
            Some(VizLibrary::Bokeh)
        } else {
            None
        }
    }

    /// 截图前需要等待出现的 CSS 选择器
    pub fn ready_selector(self) -> Option<&'static str> {
        match self {
            VizLibrary::Folium => Some(".leaflet-tile-loaded"),
            VizLibrary::Plotly => Some(".plotly .main-svg"),
            VizLibrary::Altair => Some(".vega-embed canvas, .vega-embed svg"),
            VizLibrary::Bokeh => Some(".bk-Canvas, .bk-canvas, canvas"),
            VizLibrary::Matplotlib => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VizLibrary::Plotly => "plotly",
            VizLibrary::Matplotlib => "matplotlib",
            VizLibrary::Folium => "folium",
            VizLibrary::Altair => "altair",
            VizLibrary::Bokeh => "bokeh",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|lib| lib.as_str() == name)
    }
}

impl fmt::Display for VizLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 导出目标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportTarget {
    Image,
    Html,
}
