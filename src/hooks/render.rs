use crate::error::{BoxError, ExceptionError};
use crate::exception::ExceptionRecord;
use crate::exception::http::escape_html;
use crate::hooks::PageRenderer;
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};

/// Serves pages from a directory
///
/// `{{code}}` and `{{message}}` placeholders are replaced with the record's
/// values, HTML-escaped. Page names must stay inside the root.
///
/// # Example
/// ```rust,no_run
/// use meshestra_exception::prelude::*;
///
/// let options = ExceptionOptions::builder()
///     .not_found_page("404.html")
///     .renderer(FilePageRenderer::new("./views"))
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct FilePageRenderer {
    root: PathBuf,
}

impl FilePageRenderer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, page: &str) -> Result<PathBuf, ExceptionError> {
        let relative = Path::new(page);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));

        if page.is_empty() || escapes {
            return Err(ExceptionError::InvalidPage(page.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl PageRenderer for FilePageRenderer {
    async fn render(&self, page: &str, record: &ExceptionRecord) -> Result<String, BoxError> {
        let path = self.resolve(page)?;
        let template = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| ExceptionError::PageRead {
                page: page.to_string(),
                source,
            })?;

        Ok(template
            .replace("{{code}}", &record.code.to_string())
            .replace("{{message}}", &escape_html(&record.message)))
    }
}
