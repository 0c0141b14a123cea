//! Model catalog and provider resolution.

use crate::Result;
use crate::transport::ModelTransport;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Provider id that defers to the model's own preference.
pub const AUTO_PROVIDER: &str = "auto";
/// Provider used when a request names none we know.
pub const DEFAULT_PROVIDER: &str = "lmstudio";

/// Substrings that mark ids of non-chat models.
const EXCLUDED_MODEL_FLAGS: [&str; 1] = ["embedding"];

/// A model the server can serve, as presented to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub value: String,
    pub label: String,
    pub providers: Vec<String>,
    pub is_new: bool,
    pub auto_provider: String,
}

impl ModelInfo {
    /// Catalog entry for a model id reported by LM Studio.
    pub fn lmstudio(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            value: id.clone(),
            label: id,
            providers: vec![DEFAULT_PROVIDER.to_string()],
            is_new: true,
            auto_provider: DEFAULT_PROVIDER.to_string(),
        }
    }

    /// Whether `provider` may serve this model. `auto` always may.
    pub fn supports(&self, provider: &str) -> bool {
        provider == AUTO_PROVIDER || self.providers.iter().any(|p| p == provider)
    }
}

/// A backend able to run completions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Provider {
    pub id: String,
    pub name: String,
    pub max_tokens: u32,
}

/// The set of known providers.
///
/// Only LM Studio is known today; it doubles as the fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Providers {
    default: Provider,
}

impl Providers {
    /// The single LM Studio provider with the given token budget.
    pub fn lmstudio(max_tokens: u32) -> Self {
        Self {
            default: Provider {
                id: DEFAULT_PROVIDER.to_string(),
                name: "LM Studio".to_string(),
                max_tokens,
            },
        }
    }

    pub fn get(&self, id: &str) -> Option<&Provider> {
        self.iter().find(|p| p.id == id)
    }

    /// Picks the provider for a request.
    ///
    /// `auto` resolves to the model's preferred provider; a known id to
    /// itself; anything else to [`DEFAULT_PROVIDER`].
    pub fn resolve(&self, requested: &str, model: &ModelInfo) -> &Provider {
        let wanted = if requested == AUTO_PROVIDER {
            model.auto_provider.as_str()
        } else {
            requested
        };
        self.get(wanted).unwrap_or(&self.default)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Provider> {
        std::iter::once(&self.default)
    }
}

/// Lazily fetched, cached list of chat models.
pub struct ModelCatalog {
    transport: Arc<dyn ModelTransport>,
    cache: RwLock<Option<Arc<[ModelInfo]>>>,
}

impl std::fmt::Debug for ModelCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelCatalog").finish_non_exhaustive()
    }
}

impl ModelCatalog {
    pub fn new(transport: Arc<dyn ModelTransport>) -> Self {
        Self {
            transport,
            cache: RwLock::new(None),
        }
    }

    /// Current model list, fetching it on first use.
    ///
    /// A failed fetch yields an empty list and is retried next time.
    pub async fn models(&self) -> Arc<[ModelInfo]> {
        if let Some(models) = self.cache.read().await.as_ref() {
            return Arc::clone(models);
        }

        let mut cache = self.cache.write().await;
        if let Some(models) = cache.as_ref() {
            return Arc::clone(models);
        }
        match self.fetch().await {
            Ok(models) => {
                *cache = Some(Arc::clone(&models));
                models
            },
            Err(err) => {
                warn!(error = %err, "could not list models");
                Arc::from(Vec::new())
            },
        }
    }

    /// Refetches the model list, replacing the cache on success.
    pub async fn refresh(&self) -> Result<Arc<[ModelInfo]>> {
        let models = self.fetch().await?;
        *self.cache.write().await = Some(Arc::clone(&models));
        Ok(models)
    }

    /// Looks a model up by value or label.
    pub async fn find(&self, name: &str) -> Option<ModelInfo> {
        self.models()
            .await
            .iter()
            .find(|m| m.value == name || m.label == name)
            .cloned()
    }

    async fn fetch(&self) -> Result<Arc<[ModelInfo]>> {
        let ids = self.transport.list_models().await?;
        let models: Vec<ModelInfo> = ids
            .into_iter()
            .filter(|id| !id.is_empty())
            .filter(|id| !EXCLUDED_MODEL_FLAGS.iter().any(|flag| id.contains(flag)))
            .map(ModelInfo::lmstudio)
            .collect();
        debug!(count = models.len(), "model catalog loaded");
        Ok(models.into())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::transport::{ByteStream, ChatRequest};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Listing {
        calls: AtomicUsize,
        fail_first: bool,
        ids: Vec<String>,
    }

    impl Listing {
        fn new(ids: &[&str], fail_first: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail_first,
                ids: ids.iter().map(ToString::to_string).collect(),
            })
        }
    }

    #[async_trait]
    impl ModelTransport for Listing {
        async fn stream_chat(&self, _request: ChatRequest) -> Result<ByteStream> {
            Err(Error::Other("not scripted".into()))
        }

        async fn list_models(&self) -> Result<Vec<String>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_first && call == 0 {
                return Err(Error::Other("server down".into()));
            }
            Ok(self.ids.clone())
        }
    }

    #[tokio::test]
    async fn fetches_once_and_filters_embeddings() {
        let listing = Listing::new(&["qwen-coder", "text-embedding-nomic", "llama"], false);
        let catalog = ModelCatalog::new(listing.clone());

        let models = catalog.models().await;
        let ids: Vec<_> = models.iter().map(|m| m.value.as_str()).collect();
        assert_eq!(ids, ["qwen-coder", "llama"]);

        catalog.models().await;
        assert!(catalog.find("llama").await.is_some());
        assert!(catalog.find("text-embedding-nomic").await.is_none());
        assert_eq!(listing.calls.load(Ordering::SeqCst), 1);

        catalog.refresh().await.unwrap();
        assert_eq!(listing.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_fetch_is_retried() {
        let listing = Listing::new(&["qwen"], true);
        let catalog = ModelCatalog::new(listing.clone());

        assert!(catalog.models().await.is_empty());
        assert_eq!(catalog.models().await.len(), 1);
        assert_eq!(listing.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn entry_shape() {
        let info = ModelInfo::lmstudio("qwen");
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "value": "qwen",
                "label": "qwen",
                "providers": ["lmstudio"],
                "isNew": true,
                "autoProvider": "lmstudio"
            })
        );
    }

    #[test]
    fn provider_resolution() {
        let providers = Providers::lmstudio(2048);
        let model = ModelInfo::lmstudio("qwen");
        assert_eq!(providers.resolve("auto", &model).id, "lmstudio");
        assert_eq!(providers.resolve("lmstudio", &model).max_tokens, 2048);
        assert_eq!(providers.resolve("openai", &model).id, DEFAULT_PROVIDER);

        assert!(model.supports("auto"));
        assert!(model.supports("lmstudio"));
        assert!(!model.supports("openai"));
    }
}
