use secrecy::Secret;
use serde::Deserialize;
use service_core::error::AppError;

use crate::extensions::Extension;

pub const SERVICE_DIR: &str = "extension-service";

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
    pub gemini: GeminiSettings,
    pub wikipedia: WikipediaSettings,
}

#[derive(Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Extension that serves requests whose host matches no extension domain.
    #[serde(default)]
    pub default_extension: Option<Extension>,
}

#[derive(Deserialize, Clone)]
pub struct TelemetrySettings {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            otlp_endpoint: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Deserialize, Clone)]
pub struct GeminiSettings {
    pub api_key: Secret<String>,
    #[serde(default = "default_gemini_api_base")]
    pub api_base: String,
    /// Model a fresh session starts with.
    #[serde(default = "default_model")]
    pub default_model: String,
    /// Models offered in the selector; a POST naming anything else is rejected.
    #[serde(default = "default_models")]
    pub models: Vec<ModelOption>,
    /// Unset means no timeout: a stalled upstream stalls the request.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ModelOption {
    pub id: String,
    pub label: String,
}

impl ModelOption {
    fn new(id: &str, label: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
        }
    }
}

fn default_gemini_api_base() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_model() -> String {
    "gemini-1.5-pro-latest".to_string()
}

fn default_models() -> Vec<ModelOption> {
    vec![
        ModelOption::new("gemini-1.5-pro-latest", "Gemini 1.5 Pro Latest"),
        ModelOption::new("gemini-1.5-flash-latest", "Gemini 1.5 Flash Latest"),
        ModelOption::new(
            "gemini-1.5-flash-exp-0827",
            "Gemini 1.5 Flash Experimental 0827",
        ),
        ModelOption::new("gemini-1.5-flash-8b", "Gemini 1.5 Flash 8b"),
    ]
}

impl GeminiSettings {
    pub fn is_known_model(&self, model: &str) -> bool {
        self.models.iter().any(|m| m.id == model)
    }
}

#[derive(Deserialize, Clone)]
pub struct WikipediaSettings {
    #[serde(default = "default_wikipedia_base_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

fn default_wikipedia_base_url() -> String {
    "https://wikipedia.org".to_string()
}

fn default_user_agent() -> String {
    concat!("extension-service/", env!("CARGO_PKG_VERSION")).to_string()
}

pub fn get_configuration() -> Result<Settings, AppError> {
    let configuration_directory = service_core::config::configuration_directory(SERVICE_DIR)?;
    service_core::config::load_settings(&configuration_directory)
}

impl Settings {
    /// Settings for tests and local runs: no API key, default catalogue, no fallback host.
    pub fn for_tests() -> Self {
        Self {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 0,
                default_extension: None,
            },
            telemetry: TelemetrySettings::default(),
            gemini: GeminiSettings {
                api_key: Secret::new(String::new()),
                api_base: default_gemini_api_base(),
                default_model: default_model(),
                models: default_models(),
                request_timeout_secs: None,
            },
            wikipedia: WikipediaSettings {
                base_url: default_wikipedia_base_url(),
                user_agent: default_user_agent(),
                request_timeout_secs: None,
            },
        }
    }
}
