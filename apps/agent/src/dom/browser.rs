//! Headless-Chrome backend for the DOM traits, via chromiumoxide (CDP).
//!
//! Compiled only with `--features browser`; the rest of the agent never
//! names chromiumoxide types directly.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::dom::SetFileInputFilesParams;
use chromiumoxide::element::Element;
use chromiumoxide::page::Page;
use futures::StreamExt;
use tracing::debug;

use super::{DomError, ElementHandle, ElementRef, PageHandle};

fn backend_err(err: impl std::fmt::Display) -> DomError {
    DomError::Backend(err.to_string())
}

/// Launches a headless Chrome and opens `url` in a fresh tab.
/// The returned browser must stay alive as long as the page is used.
pub async fn open(url: &str) -> Result<(Browser, CdpPage), DomError> {
    let config = BrowserConfig::builder()
        .build()
        .map_err(DomError::Backend)?;
    let (browser, mut handler) = Browser::launch(config).await.map_err(backend_err)?;

    tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(err) = event {
                debug!("CDP handler event error: {err}");
            }
        }
    });

    let page = browser.new_page(url).await.map_err(backend_err)?;
    Ok((browser, CdpPage { page }))
}

#[derive(Clone)]
pub struct CdpPage {
    page: Page,
}

struct CdpElement {
    page: Page,
    element: Element,
}

impl CdpElement {
    fn wrap(page: &Page, element: Element) -> ElementRef {
        Arc::new(CdpElement {
            page: page.clone(),
            element,
        })
    }

    async fn eval_on_self(&self, function: &str) -> Result<serde_json::Value, DomError> {
        let returns = self
            .element
            .call_js_fn(function, false)
            .await
            .map_err(backend_err)?;
        Ok(returns
            .result
            .value
            .unwrap_or(serde_json::Value::Null))
    }
}

#[async_trait]
impl ElementHandle for CdpElement {
    async fn tag_name(&self) -> Result<String, DomError> {
        let value = self
            .eval_on_self("function() { return this.tagName.toLowerCase(); }")
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn attr(&self, name: &str) -> Result<Option<String>, DomError> {
        self.element.attribute(name).await.map_err(backend_err)
    }

    async fn text(&self) -> Result<String, DomError> {
        let text = self.element.inner_text().await.map_err(backend_err)?;
        Ok(text.unwrap_or_default().trim().to_string())
    }

    async fn value(&self) -> Result<String, DomError> {
        let value = self
            .eval_on_self("function() { return this.value === undefined ? '' : String(this.value); }")
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn is_displayed(&self) -> Result<bool, DomError> {
        let value = self
            .eval_on_self(
                "function() { return !!(this.offsetWidth || this.offsetHeight || this.getClientRects().length); }",
            )
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn is_checked(&self) -> Result<bool, DomError> {
        let value = self
            .eval_on_self("function() { return !!(this.checked || this.selected); }")
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn click(&self) -> Result<(), DomError> {
        self.element
            .scroll_into_view()
            .await
            .map_err(backend_err)?;
        self.element.click().await.map_err(backend_err)?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), DomError> {
        self.eval_on_self(
            "function() { this.value = ''; this.dispatchEvent(new Event('input', { bubbles: true })); }",
        )
        .await?;
        Ok(())
    }

    async fn type_text(&self, text: &str) -> Result<(), DomError> {
        self.element.click().await.map_err(backend_err)?;
        self.element.type_str(text).await.map_err(backend_err)?;
        Ok(())
    }

    async fn select_by_label(&self, label: &str) -> Result<(), DomError> {
        let function = format!(
            "function() {{\
               const wanted = {label:?};\
               for (const option of this.options) {{\
                 if (option.label.trim() === wanted) {{\
                   this.value = option.value;\
                   this.dispatchEvent(new Event('change', {{ bubbles: true }}));\
                   return true;\
                 }}\
               }}\
               return false;\
             }}"
        );
        let value = self.eval_on_self(&function).await?;
        if value.as_bool().unwrap_or(false) {
            Ok(())
        } else {
            Err(DomError::Interaction(format!("no option labelled '{label}'")))
        }
    }

    async fn set_files(&self, paths: &[PathBuf]) -> Result<(), DomError> {
        let files: Vec<String> = paths
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        let params = SetFileInputFilesParams::builder()
            .files(files)
            .backend_node_id(self.element.backend_node_id)
            .build()
            .map_err(DomError::Backend)?;
        self.page.execute(params).await.map_err(backend_err)?;
        Ok(())
    }

    async fn query(&self, selector: &str) -> Result<Vec<ElementRef>, DomError> {
        let found = self
            .element
            .find_elements(selector)
            .await
            .unwrap_or_default();
        Ok(found
            .into_iter()
            .map(|e| CdpElement::wrap(&self.page, e))
            .collect())
    }
}

#[async_trait]
impl PageHandle for CdpPage {
    async fn query(&self, selector: &str) -> Result<Vec<ElementRef>, DomError> {
        let found = self.page.find_elements(selector).await.unwrap_or_default();
        Ok(found
            .into_iter()
            .map(|e| CdpElement::wrap(&self.page, e))
            .collect())
    }

    async fn wait_for(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<Option<ElementRef>, DomError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(found) = self.query_first(selector).await? {
                return Ok(Some(found));
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}
