//! JSON processing pipeline: structural parse → metadata.

use std::sync::Arc;

use serde_json::Value;

use docsweep_shared::{DocsweepError, Fetcher, ProcessedContent, RawContent, Result};

use crate::ContentPipeline;
use crate::context::{PipelineOptions, ProcessingContext};
use crate::dispatcher::{Next, Stage};

/// Pipeline for `application/json` and `*+json` documents.
pub struct JsonPipeline {
    stages: Vec<Arc<dyn Stage>>,
}

impl JsonPipeline {
    pub fn new() -> Self {
        Self {
            stages: vec![Arc::new(JsonParseStage), Arc::new(JsonMetadataStage)],
        }
    }
}

impl Default for JsonPipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ContentPipeline for JsonPipeline {
    fn name(&self) -> &'static str {
        "json"
    }

    fn can_process(&self, mime_type: &str) -> bool {
        mime_type == "application/json" || mime_type.ends_with("+json")
    }

    async fn process(
        &self,
        raw: &RawContent,
        options: &PipelineOptions,
        fetcher: Option<Arc<dyn Fetcher>>,
    ) -> ProcessedContent {
        crate::run_stages(&self.stages, raw, options, fetcher).await
    }
}

// ---------------------------------------------------------------------------
// Parse stage
// ---------------------------------------------------------------------------

/// Validates that the content is well-formed JSON. Fail-closed: metadata
/// extraction over a broken document is meaningless.
struct JsonParseStage;

#[async_trait::async_trait]
impl Stage for JsonParseStage {
    fn name(&self) -> &'static str {
        "json-parse"
    }

    async fn process(&self, ctx: &mut ProcessingContext, next: &mut Next) -> Result<()> {
        serde_json::from_str::<Value>(&ctx.content)
            .map_err(|e| DocsweepError::stage(self.name(), format!("invalid JSON: {e}")))?;
        next.proceed()
    }
}

// ---------------------------------------------------------------------------
// Metadata stage
// ---------------------------------------------------------------------------

/// Records the document's top-level shape and, for objects, a title from a
/// `title` or `name` member. Fail-open by construction: the parse stage
/// already guaranteed well-formed input.
struct JsonMetadataStage;

#[async_trait::async_trait]
impl Stage for JsonMetadataStage {
    fn name(&self) -> &'static str {
        "json-metadata"
    }

    async fn process(&self, ctx: &mut ProcessingContext, next: &mut Next) -> Result<()> {
        // The parse stage just validated this.
        let Ok(value) = serde_json::from_str::<Value>(&ctx.content) else {
            return next.proceed();
        };

        let (shape, members) = match &value {
            Value::Object(map) => ("object", map.len()),
            Value::Array(items) => ("array", items.len()),
            _ => ("scalar", 1),
        };
        ctx.metadata.insert("json_shape".into(), serde_json::json!(shape));
        ctx.metadata
            .insert("member_count".into(), serde_json::json!(members));

        if let Value::Object(map) = &value {
            let title = map
                .get("title")
                .or_else(|| map.get("name"))
                .and_then(|v| v.as_str());
            if let Some(title) = title {
                ctx.metadata.insert("title".into(), serde_json::json!(title));
            }
        }

        next.proceed()
    }
}
