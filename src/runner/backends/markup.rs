use async_trait::async_trait;

use crate::error::Result;
use crate::language::Language;
use crate::runner::traits::Backend;
use crate::runner::ExecutionOutput;

/// Embed user markup in a minimal document with a baseline style reset.
pub fn wrap_document(source: &str) -> String {
    format!(
        r#"
<!DOCTYPE html>
<html>
<head>
  <style>
    * {{ margin: 0; padding: 0; box-sizing: border-box; }}
    h1 {{ font-size: 2em; font-weight: bold; margin-bottom: 0.5em; }}
    p {{ font-size: 1em; margin-bottom: 1em; }}
    div {{ font-size: 1em; }}
  </style>
</head>
<body>
{}
</body>
</html>"#,
        source
    )
}

/// HTML backend: nothing is executed, the document is handed back for rendering.
pub struct MarkupBackend;

#[async_trait]
impl Backend for MarkupBackend {
    fn name(&self) -> &str {
        "markup"
    }

    fn language(&self) -> Language {
        Language::Markup
    }

    async fn execute(&self, source: &str) -> Result<ExecutionOutput> {
        Ok(ExecutionOutput::markup(wrap_document(source)))
    }
}
