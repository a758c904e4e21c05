//! Offline generation backend used when no generation endpoint is configured.
//!
//! Renders the prompt into a fixed page so the rest of the pipeline (quota,
//! versioning, serving) behaves exactly as it would against a real model.

use async_trait::async_trait;

use crate::domain::generation::escape_html;
use crate::domain::ports::{GenerationBackend, GenerationBackendError, GenerationRequest};

/// Backend that wraps each prompt in a static HTML template.
#[derive(Debug, Default, Clone, Copy)]
pub struct TemplateGenerationBackend;

#[async_trait]
impl GenerationBackend for TemplateGenerationBackend {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationBackendError> {
        Ok(render(request))
    }
}

fn render(request: &GenerationRequest) -> String {
    let title = escape_html(&request.title);
    let paragraphs = request
        .prompt
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| format!("    <p>{}</p>", escape_html(line)))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n  <meta charset=\"utf-8\">\n  \
         <title>{title}</title>\n</head>\n<body>\n  <main>\n    <h1>{title}</h1>\n{paragraphs}\n  \
         </main>\n  <footer><small>{tier} draft</small></footer>\n</body>\n</html>\n",
        tier = request.tier,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ModelTier;

    #[tokio::test]
    async fn renders_escaped_prompt_lines() {
        let request = GenerationRequest {
            tier: ModelTier::Fast,
            title: "Otters & Friends".to_owned(),
            context: String::new(),
            prompt: "a page about <otters>\n\n  and rivers  ".to_owned(),
        };

        let html = TemplateGenerationBackend
            .generate(&request)
            .await
            .expect("template renders");

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>Otters &amp; Friends</title>"));
        assert!(html.contains("<p>a page about &lt;otters&gt;</p>"));
        assert!(html.contains("<p>and rivers</p>"));
        assert!(html.contains("fast draft"));
    }
}
