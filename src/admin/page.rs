//! 管理面板页面
//!
//! 服务端直接拼接 HTML，所有动态内容都经过转义

use crate::admin::state::PanelStatus;
use crate::utils::text::html_escape;

/// 面板页面需要的数据
#[derive(Debug, Clone, Default)]
pub struct PanelView {
    pub notebooks: Vec<String>,
    pub status: PanelStatus,
    /// 最近处理的 notebook 的图片（URL）
    pub image_url: Option<String>,
    /// 最近处理的 notebook 的交互式预览（URL）
    pub html_url: Option<String>,
    pub gallery_url: String,
}

pub fn render_panel(view: &PanelView) -> String {
    let options = if view.notebooks.is_empty() {
        r#"<option value="" disabled selected>（没有可处理的 notebook）</option>"#.to_string()
    } else {
        view.notebooks
            .iter()
            .map(|name| {
                let selected = if view.status.last_notebook.as_deref() == Some(name.as_str()) {
                    " selected"
                } else {
                    ""
                };
                format!(
                    r#"<option value="{name}"{selected}>{name}</option>"#,
                    name = html_escape(name),
                    selected = selected
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    let status = if view.status.status.is_empty() {
        "就绪".to_string()
    } else {
        html_escape(&view.status.status)
    };

    let last = view
        .status
        .last_notebook
        .as_deref()
        .map(html_escape)
        .unwrap_or_else(|| "（无）".to_string());

    let output = html_escape(&view.status.output.join("\n"));

    let preview = match &view.image_url {
        Some(url) => format!(
            r#"<img class="preview" src="{}" alt="{}">"#,
            html_escape(url),
            last
        ),
        None => r#"<p class="muted">暂无图片</p>"#.to_string(),
    };

    let interactive = view
        .html_url
        .as_deref()
        .map(|url| {
            format!(
                r#"<p><a href="{}" target="_blank">打开交互式预览</a></p>"#,
                html_escape(url)
            )
        })
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="zh-CN">
<head>
<meta charset="utf-8">
<title>duckit 管理面板</title>
<style>
body {{ font-family: sans-serif; max-width: 1100px; margin: 2em auto; color: #222; }}
section {{ border: 1px solid #ddd; border-radius: 8px; padding: 1em; margin-bottom: 1em; }}
pre {{ background: #f6f8fa; padding: 1em; max-height: 400px; overflow: auto; white-space: pre-wrap; }}
.preview {{ max-width: 100%; border: 1px solid #eee; }}
.status {{ font-weight: bold; }}
.muted {{ color: #888; }}
form {{ display: inline-block; margin-right: 1em; }}
</style>
</head>
<body>
<h1>🦆 duckit 管理面板</h1>

<section>
<h2>上传 notebook</h2>
<form action="/upload" method="post" enctype="multipart/form-data">
<input type="file" name="file" accept=".ipynb" required>
<button type="submit">上传</button>
</form>
</section>

<section>
<h2>处理</h2>
<form action="/process" method="post">
<select name="notebook">
{options}
</select>
<button type="submit">处理</button>
</form>
<form action="/gallery" method="post"><button type="submit">生成画廊</button></form>
<form action="/publish" method="post"><button type="submit">发布当前 notebook</button></form>
<a href="/archive">下载发布包</a> · <a href="{gallery}" target="_blank">查看画廊</a>
</section>

<section>
<h2>状态</h2>
<p class="status">{status}</p>
<p>最近处理: {last}</p>
<pre>{output}</pre>
</section>

<section>
<h2>预览</h2>
{preview}
{interactive}
</section>
</body>
</html>
"#,
        options = options,
        gallery = html_escape(&view.gallery_url),
        status = status,
        last = last,
        output = output,
        preview = preview,
        interactive = interactive,
    )
}
