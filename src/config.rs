use crate::error::ChatError;
use crate::llm::provider::DEFAULT_AZURE_API_VERSION;
use crate::llm::{ApiKey, DEFAULT_BASE_URL, DEFAULT_MODEL, LlmSettings, Provider};
use clap::Parser;
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// Default timeout for one completion request.
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 60;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Address to bind
    #[arg(long, env = "HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Seconds of inactivity after which a session ends
    #[arg(long, env = "SESSION_IDLE_TIMEOUT_SECS")]
    pub session_idle_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub sessions: SessionsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    /// 0 disables the request timeout.
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionsConfig {
    pub idle_timeout_secs: u64,
    pub sweep_interval_secs: u64,
}

impl SessionsConfig {
    #[must_use]
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    /// Layering, lowest to highest: defaults, config file, `CHATMAVEN_*`
    /// environment, CLI flags (and their env aliases).
    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let mut builder = Config::builder()
            .set_default("server.port", 8501)?
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.request_timeout_secs", 120)?
            .set_default("sessions.idle_timeout_secs", 30 * 60)?
            .set_default("sessions.sweep_interval_secs", 60)?;

        builder = match &cli.config {
            Some(path) => builder.add_source(File::with_name(path)),
            None => builder.add_source(File::new("config.yaml", FileFormat::Yaml).required(false)),
        };

        // E.g. CHATMAVEN_SERVER__PORT=8000
        builder = builder.add_source(
            Environment::with_prefix("CHATMAVEN")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        if let Some(host) = cli.host {
            builder = builder.set_override("server.host", host)?;
        }
        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", i64::from(port))?;
        }
        if let Some(secs) = cli.session_idle_timeout_secs {
            builder = builder.set_override(
                "sessions.idle_timeout_secs",
                i64::try_from(secs).unwrap_or(i64::MAX),
            )?;
        }

        builder.build()?.try_deserialize()
    }
}

/// Read completion settings from the process environment.
pub fn load_llm_settings() -> Result<LlmSettings, ChatError> {
    llm_settings_from(|name| std::env::var(name).ok())
}

/// Build completion settings from an arbitrary variable lookup.
///
/// `OPENAI_API_KEY` is required and must not be blank.
pub fn llm_settings_from<F>(lookup: F) -> Result<LlmSettings, ChatError>
where
    F: Fn(&str) -> Option<String>,
{
    let non_blank = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    let api_key = lookup("OPENAI_API_KEY")
        .and_then(ApiKey::new)
        .ok_or(ChatError::MissingCredential)?;

    let base_url = non_blank("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let parsed = Url::parse(base_url.trim()).map_err(|e| ChatError::InvalidSetting {
        name: "OPENAI_BASE_URL",
        reason: e.to_string(),
    })?;

    let model = non_blank("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());

    let timeout_secs = match non_blank("OPENAI_TIMEOUT_SECS") {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|e| ChatError::InvalidSetting {
                name: "OPENAI_TIMEOUT_SECS",
                reason: e.to_string(),
            })?,
        None => DEFAULT_LLM_TIMEOUT_SECS,
    };

    let provider = if Provider::is_azure_host(&parsed) {
        let deployment_name =
            non_blank("AZURE_DEPLOYMENT_NAME").ok_or_else(|| ChatError::InvalidSetting {
                name: "AZURE_DEPLOYMENT_NAME",
                reason: "required for Azure OpenAI endpoints".to_string(),
            })?;
        Provider::AzureOpenAI {
            deployment_name,
            api_version: non_blank("AZURE_API_VERSION")
                .unwrap_or_else(|| DEFAULT_AZURE_API_VERSION.to_string()),
        }
    } else {
        Provider::detect_from_url(&parsed)
    };

    Ok(LlmSettings {
        base_url: base_url.trim().to_string(),
        api_key,
        model,
        provider,
        timeout: Duration::from_secs(timeout_secs),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_missing_key_is_fatal() {
        let err = llm_settings_from(lookup(&[])).unwrap_err();
        assert!(matches!(err, ChatError::MissingCredential));
    }

    #[test]
    fn test_blank_key_is_fatal() {
        for blank in ["", " ", "   "] {
            let err = llm_settings_from(lookup(&[("OPENAI_API_KEY", blank)])).unwrap_err();
            assert!(matches!(err, ChatError::MissingCredential));
        }
    }

    #[test]
    fn test_defaults() {
        let settings = llm_settings_from(lookup(&[("OPENAI_API_KEY", "sk-test")])).unwrap();
        assert_eq!(settings.base_url, DEFAULT_BASE_URL);
        assert_eq!(settings.model, DEFAULT_MODEL);
        assert_eq!(settings.provider, Provider::OpenAI);
        assert_eq!(settings.api_key.expose(), "sk-test");
        assert_eq!(settings.timeout, Duration::from_secs(DEFAULT_LLM_TIMEOUT_SECS));
    }

    #[test]
    fn test_generic_provider() {
        let settings = llm_settings_from(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_BASE_URL", "http://localhost:11434"),
            ("OPENAI_MODEL", "llama3"),
            ("OPENAI_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();
        assert_eq!(settings.provider, Provider::Generic);
        assert_eq!(settings.model, "llama3");
        assert_eq!(settings.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_base_url() {
        let err = llm_settings_from(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_BASE_URL", "not a url"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ChatError::InvalidSetting {
                name: "OPENAI_BASE_URL",
                ..
            }
        ));
    }

    #[test]
    fn test_azure_requires_deployment() {
        let vars = [
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_BASE_URL", "https://res.openai.azure.com"),
        ];
        let err = llm_settings_from(lookup(&vars)).unwrap_err();
        assert!(matches!(
            err,
            ChatError::InvalidSetting {
                name: "AZURE_DEPLOYMENT_NAME",
                ..
            }
        ));

        let settings = llm_settings_from(lookup(&[
            vars[0],
            vars[1],
            ("AZURE_DEPLOYMENT_NAME", "chat"),
        ]))
        .unwrap();
        assert_eq!(
            settings.provider,
            Provider::AzureOpenAI {
                deployment_name: "chat".to_string(),
                api_version: DEFAULT_AZURE_API_VERSION.to_string(),
            }
        );
    }
}
