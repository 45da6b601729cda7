use crate::core::history::GenerationHistory;
use crate::core::retry::RetryableService;
use crate::core::{GenerateRequest, GenerateResponse, ImageGenerator, Result, Style};
use crate::utils::error::GenError;
use crate::utils::validation::{validate_image_data_url, Validate};
use std::sync::Arc;

impl Validate for GenerateRequest {
    fn validate(&self) -> Result<()> {
        if let Some(image) = &self.image_data_url {
            validate_image_data_url(image)?;
        }
        if self.image_data_url.is_none() && self.prompt.trim().is_empty() {
            return Err(GenError::validation(
                "Provide an image or a prompt to generate from",
            ));
        }
        Ok(())
    }
}

/// Inputs being edited before a generation is started.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub image_data_url: Option<String>,
    pub prompt: String,
    pub style: Option<Style>,
}

impl Draft {
    pub fn can_generate(&self) -> bool {
        (self.image_data_url.is_some() || !self.prompt.trim().is_empty()) && self.style.is_some()
    }

    pub fn to_request(&self) -> Result<GenerateRequest> {
        let style = self
            .style
            .ok_or_else(|| GenError::validation("Pick a style before generating"))?;
        let request = GenerateRequest {
            image_data_url: self.image_data_url.clone(),
            prompt: self.prompt.clone(),
            style,
        };
        request.validate()?;
        Ok(request)
    }
}

/// The generate-and-browse workflow: one draft, one retrying backend, a short history.
pub struct Studio<G> {
    service: Arc<RetryableService<G>>,
    draft: Draft,
    history: GenerationHistory,
    selected: Option<String>,
}

impl<G: ImageGenerator> Studio<G> {
    pub fn new(service: RetryableService<G>) -> Self {
        Self::with_shared(Arc::new(service))
    }

    pub fn with_shared(service: Arc<RetryableService<G>>) -> Self {
        Self {
            service,
            draft: Draft::default(),
            history: GenerationHistory::new(),
            selected: None,
        }
    }

    /// Handle for aborting from another task.
    pub fn service(&self) -> Arc<RetryableService<G>> {
        self.service.clone()
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn history(&self) -> &GenerationHistory {
        &self.history
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn set_image(&mut self, data_url: Option<String>) {
        self.draft.image_data_url = data_url;
        self.selected = None;
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.draft.prompt = prompt.into();
        self.selected = None;
    }

    pub fn set_style(&mut self, style: Option<Style>) {
        self.draft.style = style;
        self.selected = None;
    }

    pub fn can_generate(&self) -> bool {
        self.draft.can_generate()
    }

    /// Runs the draft through the retrying backend. On success the result is
    /// recorded and the draft is cleared; on failure the draft is left as is.
    pub async fn generate<F>(&mut self, on_retry: F) -> Result<GenerateResponse>
    where
        F: FnMut(u32, &GenError) + Send,
    {
        let request = self.draft.to_request()?;
        tracing::info!(
            "🎨 Generating {} image ({} chars of prompt, image: {})",
            request.style,
            request.prompt.chars().count(),
            request.image_data_url.is_some()
        );

        let response = self.service.generate_with_retry(&request, on_retry).await?;

        self.history.push(response.clone());
        self.draft = Draft::default();
        self.selected = None;
        Ok(response)
    }

    /// Restores prompt and style from a past generation. The source image is not kept in history.
    pub fn select(&mut self, id: &str) -> Option<&GenerateResponse> {
        let item = self.history.get(id)?;
        self.draft = Draft {
            image_data_url: None,
            prompt: item.prompt.clone(),
            style: Some(item.style),
        };
        self.selected = Some(item.id.clone());
        Some(item)
    }

    pub fn abort(&self) {
        self.service.abort();
    }
}
