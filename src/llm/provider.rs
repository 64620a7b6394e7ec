//! Provider-specific endpoint and authentication handling.
//!
//! `OpenAI` and most compatible gateways share the `/v1/chat/completions`
//! layout with bearer auth; Azure `OpenAI` routes by deployment and expects an
//! `api-key` header.

use url::Url;

use super::ApiKey;

/// API version used for Azure `OpenAI` when none is configured.
pub const DEFAULT_AZURE_API_VERSION: &str = "2024-08-01-preview";

/// Supported completion providers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provider {
    /// `OpenAI` (api.openai.com)
    OpenAI,
    /// Azure `OpenAI` Service
    AzureOpenAI {
        /// Deployment name
        deployment_name: String,
        /// API version (e.g., "2024-08-01-preview")
        api_version: String,
    },
    /// Generic OpenAI-compatible provider
    Generic,
}

impl Provider {
    /// Whether `base_url` points at an Azure `OpenAI` resource.
    #[must_use]
    pub fn is_azure_host(base_url: &Url) -> bool {
        base_url
            .host_str()
            .is_some_and(|host| host.to_ascii_lowercase().ends_with(".openai.azure.com"))
    }

    /// Detect the provider for a non-Azure base URL.
    #[must_use]
    pub fn detect_from_url(base_url: &Url) -> Self {
        match base_url.host_str().map(str::to_ascii_lowercase) {
            Some(host) if host == "api.openai.com" => Self::OpenAI,
            _ => Self::Generic,
        }
    }

    /// Build the chat completions URL for this provider.
    #[must_use]
    pub fn build_chat_url(&self, base_url: &str) -> String {
        let base = base_url.trim_end_matches('/');

        match self {
            Self::AzureOpenAI {
                deployment_name,
                api_version,
            } => format!(
                "{base}/openai/deployments/{deployment_name}/chat/completions?api-version={api_version}"
            ),
            Self::OpenAI | Self::Generic => format!("{base}/v1/chat/completions"),
        }
    }

    /// Attach the credential in the form this provider expects.
    #[must_use]
    pub fn authorize(
        &self,
        request: reqwest::RequestBuilder,
        api_key: &ApiKey,
    ) -> reqwest::RequestBuilder {
        match self {
            Self::AzureOpenAI { .. } => request.header("api-key", api_key.expose()),
            Self::OpenAI | Self::Generic => request.bearer_auth(api_key.expose()),
        }
    }
}
