//! JS 执行器 - 基础设施层
//!
//! 持有截图页面，只暴露"执行 JS"和"调整视口"的能力

use anyhow::Result;
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value as JsonValue;

/// 页面内容尺寸
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ContentSize {
    pub width: i64,
    pub height: i64,
}

impl ContentSize {
    /// 限制在 [min, max] 范围内
    pub fn clamp(self, min: i64, max: i64) -> Self {
        Self {
            width: self.width.clamp(min, max),
            height: self.height.clamp(min, max),
        }
    }
}

const MEASURE_CONTENT_JS: &str = r#"
(() => {
    const doc = document.documentElement;
    const body = document.body || doc;
    return {
        width: Math.ceil(Math.max(doc.scrollWidth, body.scrollWidth)),
        height: Math.ceil(Math.max(doc.scrollHeight, body.scrollHeight)),
    };
})()
"#;

/// JS 执行器
///
/// 不认识 notebook，也不关心截图流程
pub struct JsExecutor {
    page: Page,
}

impl JsExecutor {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    /// 执行 JS 代码并返回 JSON 结果
    pub async fn eval(&self, js_code: impl Into<String>) -> Result<JsonValue> {
        let result = self.page.evaluate(js_code.into()).await?;
        let json_value = result.into_value()?;
        Ok(json_value)
    }

    /// 执行 JS 代码并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> Result<T> {
        let json_value = self.eval(js_code).await?;
        let typed_value = serde_json::from_value(json_value)?;
        Ok(typed_value)
    }

    /// 测量页面内容尺寸
    pub async fn content_size(&self) -> Result<ContentSize> {
        self.eval_as(MEASURE_CONTENT_JS).await
    }

    /// 覆盖视口尺寸
    pub async fn set_viewport(&self, size: ContentSize) -> Result<()> {
        let params = SetDeviceMetricsOverrideParams::new(size.width, size.height, 1.0, false);
        self.page.execute(params).await?;
        Ok(())
    }
}
