//! Request handlers for initial generation and follow-up edits.
//!
//! Both handlers validate the request, resolve the model and provider, and
//! talk to the [`ModelTransport`]. Generation streams the model output
//! straight into the caller's sink; an edit buffers the whole response and
//! runs it through [`apply_response`].
//!
//! Failures are reported as [`ApiFailure`], an HTTP-style status plus a JSON
//! body, so a server front end can forward them unchanged.

use crate::config::Config;
use crate::lines::LineRange;
use crate::models::{ModelCatalog, ModelInfo, Provider, Providers};
use crate::pages::{Page, PageStore};
use crate::patch::{PatchReport, apply_response};
use crate::prompts::{FollowUpContext, InitialContext, follow_up_messages, initial_messages};
use crate::relay::{Relay, RelayOutcome};
use crate::sse::collect_content;
use crate::transport::{ByteStream, ChatRequest, ModelTransport};
use crate::{Error, Result};
use futures::stream;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::io::AsyncWrite;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const MISSING_FIELDS: &str = "Missing required fields";

/// Body of an initial-generation request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerateRequest {
    pub prompt: Option<String>,
    pub redesign_markdown: Option<String>,
    pub model: Option<String>,
    /// Provider id; absent means `auto`.
    pub provider: Option<String>,
    pub pages: Vec<Page>,
    pub previous_prompts: Vec<String>,
}

/// Body of a follow-up edit request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditRequest {
    pub prompt: Option<String>,
    pub pages: Vec<Page>,
    pub previous_prompts: Vec<String>,
    pub selected_element_html: Option<String>,
    pub model: Option<String>,
    pub provider: Option<String>,
    /// Image references offered to the model.
    pub files: Vec<String>,
}

/// Successful edit result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditResponse {
    pub ok: bool,
    pub updated_lines: Vec<LineRange>,
    pub pages: Vec<Page>,
    #[serde(skip)]
    pub report: PatchReport,
}

/// JSON body of a failed request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureBody {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_select_provider: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_pro_modal: Option<bool>,
}

/// A rejected request: status code and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiFailure {
    pub status: u16,
    pub body: FailureBody,
}

impl std::fmt::Display for ApiFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "request failed with status {}: {}", self.status, self.text())
    }
}

impl std::error::Error for ApiFailure {}

impl ApiFailure {
    fn bad_request(error: impl Into<String>) -> Self {
        Self {
            status: 400,
            body: FailureBody {
                error: Some(error.into()),
                ..FailureBody::default()
            },
        }
    }

    /// Maps a core error onto the status taxonomy of the handlers.
    pub fn from_error(err: &Error) -> Self {
        let message = err.to_string();
        match err {
            Error::Validation(_) | Error::InvalidModel(_) => Self::bad_request(message),
            Error::ProviderUnsupported { .. } => {
                let mut failure = Self::bad_request(message);
                failure.body.open_select_provider = Some(true);
                failure
            },
            Error::NoResponseBody | Error::NoContent => Self {
                status: 400,
                body: FailureBody {
                    message: Some(message),
                    ..FailureBody::default()
                },
            },
            _ if err.is_quota_exceeded() => Self {
                status: 402,
                body: FailureBody {
                    message: Some(message),
                    open_pro_modal: Some(true),
                    ..FailureBody::default()
                },
            },
            _ => Self {
                status: 500,
                body: FailureBody {
                    message: Some(message),
                    open_select_provider: Some(true),
                    ..FailureBody::default()
                },
            },
        }
    }

    /// The human-readable part of the body.
    pub fn text(&self) -> &str {
        self.body
            .error
            .as_deref()
            .or(self.body.message.as_deref())
            .unwrap_or_default()
    }
}

impl From<Error> for ApiFailure {
    fn from(err: Error) -> Self {
        Self::from_error(&err)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Entry point for site generation and editing.
pub struct SiteEditor {
    transport: Arc<dyn ModelTransport>,
    catalog: Arc<ModelCatalog>,
    providers: Providers,
    relay: Relay,
}

impl SiteEditor {
    /// Creates an editor whose catalog lists models through `transport`.
    pub fn new(transport: Arc<dyn ModelTransport>, config: &Config) -> Self {
        let catalog = Arc::new(ModelCatalog::new(Arc::clone(&transport)));
        Self::with_catalog(transport, catalog, config)
    }

    /// Creates an editor sharing an existing catalog.
    pub fn with_catalog(
        transport: Arc<dyn ModelTransport>,
        catalog: Arc<ModelCatalog>,
        config: &Config,
    ) -> Self {
        Self {
            transport,
            catalog,
            providers: Providers::lmstudio(config.lmstudio.max_tokens),
            relay: Relay::new(config.relay.channel_capacity),
        }
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    async fn select_model(&self, name: Option<&str>) -> Result<ModelInfo> {
        let name = name.unwrap_or_default();
        self.catalog
            .find(name)
            .await
            .ok_or_else(|| Error::InvalidModel(name.to_string()))
    }

    fn select_provider<'a>(&'a self, requested: Option<&str>, model: &ModelInfo) -> &'a Provider {
        self.providers
            .resolve(requested.unwrap_or(crate::models::AUTO_PROVIDER), model)
    }

    async fn check_generate(&self, request: &GenerateRequest) -> Result<(ModelInfo, u32)> {
        let has_input = non_empty(request.prompt.as_deref()).is_some()
            || non_empty(request.redesign_markdown.as_deref()).is_some();
        if non_empty(request.model.as_deref()).is_none() || !has_input {
            return Err(Error::Validation(MISSING_FIELDS.into()));
        }

        let model = self.select_model(request.model.as_deref()).await?;
        let requested = request
            .provider
            .as_deref()
            .unwrap_or(crate::models::AUTO_PROVIDER);
        if !model.supports(requested) {
            return Err(Error::ProviderUnsupported {
                provider: requested.to_string(),
            });
        }
        let max_tokens = self.select_provider(Some(requested), &model).max_tokens;
        Ok((model, max_tokens))
    }

    /// Streams a freshly generated page into `sink`.
    ///
    /// Validation failures are returned before anything is written. Once
    /// the request is accepted, transport failures are written into the
    /// stream as `{"ok":false,"message":...}` and the sink is closed; the
    /// returned [`RelayOutcome`] says how the stream ended.
    ///
    /// `cancel` is honoured while waiting for the model to answer as well
    /// as during streaming.
    pub async fn generate<W>(
        &self,
        request: &GenerateRequest,
        sink: &mut W,
        cancel: CancellationToken,
    ) -> std::result::Result<RelayOutcome, ApiFailure>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let (model, max_tokens) = self.check_generate(request).await?;

        let messages = initial_messages(&InitialContext {
            prompt: request.prompt.as_deref(),
            redesign_markdown: request.redesign_markdown.as_deref(),
            pages: &request.pages,
            previous_prompts: &request.previous_prompts,
        });
        info!(model = %model.value, "starting generation");

        let chat = ChatRequest::new(model.value, messages, max_tokens);
        let body: ByteStream = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!("generation cancelled before the model answered");
                Box::pin(stream::empty())
            },
            result = self.transport.stream_chat(chat) => match result {
                Ok(body) => body,
                Err(err) => {
                    debug!(error = %err, "completion request failed before streaming");
                    Box::pin(stream::iter(vec![Err(err)]))
                },
            },
        };
        // A cancelled token makes the relay close the sink without writing
        Ok(self.relay.run(body, sink, cancel).await)
    }

    /// Applies a follow-up edit and returns the updated pages.
    pub async fn edit(&self, request: &EditRequest) -> std::result::Result<EditResponse, ApiFailure> {
        self.run_edit(request).await.map_err(ApiFailure::from)
    }

    async fn run_edit(&self, request: &EditRequest) -> Result<EditResponse> {
        let Some(prompt) = non_empty(request.prompt.as_deref()) else {
            return Err(Error::Validation(MISSING_FIELDS.into()));
        };
        if request.pages.is_empty() {
            return Err(Error::Validation(MISSING_FIELDS.into()));
        }

        let model = self.select_model(request.model.as_deref()).await?;
        let max_tokens = self
            .select_provider(request.provider.as_deref(), &model)
            .max_tokens;

        let messages = follow_up_messages(&FollowUpContext {
            prompt,
            previous_prompts: &request.previous_prompts,
            selected_element_html: request.selected_element_html.as_deref(),
            pages: &request.pages,
            files: &request.files,
        });
        info!(model = %model.value, pages = request.pages.len(), "starting edit");

        let body = self
            .transport
            .stream_chat(ChatRequest::new(model.value, messages, max_tokens))
            .await?;
        let text = collect_content(body).await?;

        let mut store = PageStore::from_pages(request.pages.iter().cloned());
        let outcome = apply_response(&mut store, &text)?;

        Ok(EditResponse {
            ok: true,
            updated_lines: outcome.updated_lines,
            pages: store.into_pages(),
            report: outcome.report,
        })
    }
}
