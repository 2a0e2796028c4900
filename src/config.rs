use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// Configuration for the transcript fetcher
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Language preference settings
    pub languages: LanguageConfig,

    /// YouTube retrieval settings
    pub youtube: YouTubeConfig,

    /// Speech-transcription fallback settings
    pub transcribe: TranscribeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageConfig {
    /// Preferred caption language when the caller does not specify one
    pub default_language: String,

    /// Ordered fallback languages tried after the preferred one
    pub fallback_languages: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YouTubeConfig {
    /// Optional proxy URL for upstream requests (e.g. "http://proxy:8080")
    pub proxy: Option<String>,

    /// Timeout for ordinary upstream requests (seconds)
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscribeConfig {
    /// Base URL of the transcription backend; None disables the fallback tier
    pub api_url: Option<String>,

    /// Timeout for transcription requests (seconds); transcription can take
    /// minutes, so this is far above the ordinary request timeout
    pub timeout_seconds: u64,
}

impl Config {
    /// Load configuration from file, falling back to environment variables
    pub fn load() -> Result<Self> {
        let config_paths = [
            "yt-transcript.toml",
            "config/yt-transcript.toml",
            "~/.config/yt-transcript/config.toml",
            "/etc/yt-transcript/config.toml",
        ];

        for path in &config_paths {
            if let Ok(config_str) = std::fs::read_to_string(path) {
                match toml::from_str::<Config>(&config_str) {
                    Ok(mut config) => {
                        tracing::info!("📄 Loaded configuration from: {}", path);
                        config.apply_env_overrides();
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file {}: {}", path, e);
                    }
                }
            }
        }

        Ok(Self::from_env())
    }

    /// Build configuration from defaults plus environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(language) = std::env::var("YT_TRANSCRIPT_DEFAULT_LANGUAGE") {
            self.languages.default_language = language;
        }

        // Comma-separated override, e.g. "zh-Hans,zh,en"
        if let Ok(fallbacks) = std::env::var("YT_TRANSCRIPT_FALLBACK_LANGUAGES") {
            self.languages.fallback_languages = fallbacks
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        if let Ok(api_url) = std::env::var("YT_TRANSCRIPT_TRANSCRIBE_API_URL") {
            self.transcribe.api_url = if api_url.is_empty() {
                None
            } else {
                Some(api_url)
            };
        }

        if let Ok(proxy) = std::env::var("YT_TRANSCRIPT_PROXY") {
            self.youtube.proxy = Some(proxy);
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.languages.default_language.is_empty() {
            return Err(anyhow!("default_language must not be empty"));
        }

        if self.youtube.request_timeout_seconds == 0 {
            return Err(anyhow!("request_timeout_seconds must be greater than 0"));
        }

        if self.transcribe.timeout_seconds <= self.youtube.request_timeout_seconds {
            return Err(anyhow!(
                "transcribe timeout must exceed the ordinary request timeout"
            ));
        }

        if let Some(url) = &self.transcribe.api_url {
            url::Url::parse(url)
                .map_err(|e| anyhow!("invalid transcribe api_url {}: {}", url, e))?;
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            languages: LanguageConfig {
                default_language: "zh-Hant".to_string(),
                fallback_languages: vec![
                    "zh-Hans".to_string(),
                    "zh".to_string(),
                    "en".to_string(),
                ],
            },
            youtube: YouTubeConfig {
                proxy: None,
                request_timeout_seconds: 30,
            },
            transcribe: TranscribeConfig {
                api_url: None,
                timeout_seconds: 300, // transcription runs for minutes on long videos
            },
        }
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_default_language(mut self, language: impl Into<String>) -> Self {
        self.config.languages.default_language = language.into();
        self
    }

    pub fn with_fallback_languages(mut self, languages: Vec<String>) -> Self {
        self.config.languages.fallback_languages = languages;
        self
    }

    pub fn with_transcribe_api_url(mut self, url: impl Into<String>) -> Self {
        self.config.transcribe.api_url = Some(url.into());
        self
    }

    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.config.youtube.proxy = Some(proxy.into());
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.languages.default_language, "zh-Hant");
        assert_eq!(
            config.languages.fallback_languages,
            vec!["zh-Hans", "zh", "en"]
        );
        assert!(config.transcribe.api_url.is_none());
        assert!(config.transcribe.timeout_seconds > config.youtube.request_timeout_seconds);
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .with_default_language("en")
            .with_fallback_languages(vec!["de".to_string()])
            .with_transcribe_api_url("http://localhost:9000")
            .build();

        assert_eq!(config.languages.default_language, "en");
        assert_eq!(config.languages.fallback_languages, vec!["de"]);
        assert_eq!(
            config.transcribe.api_url.as_deref(),
            Some("http://localhost:9000")
        );
    }

    #[test]
    fn test_config_validation() {
        assert!(Config::default().validate().is_ok());

        let mut config = Config::default();
        config.languages.default_language = String::new();
        assert!(config.validate().is_err());

        let bad_url = ConfigBuilder::new()
            .with_transcribe_api_url("not a url")
            .build();
        assert!(bad_url.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = Config::default();
        let serialized = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(
            parsed.languages.default_language,
            config.languages.default_language
        );
    }
}
