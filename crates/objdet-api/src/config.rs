//! Server configuration.

use std::path::PathBuf;
use std::str::FromStr;

use objdet_client::DetectionClientConfig;
use objdet_models::{parse_confidence, DEFAULT_CONFIDENCE_THRESHOLD};
use objdet_vision::ModelConfig;
use tracing::warn;

/// Default request body limit (20 MiB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 20 * 1024 * 1024;

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_origins() -> Vec<String> {
    std::env::var("CORS_ORIGINS")
        .map(|s| {
            s.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_else(|_| vec!["*".to_string()])
}

fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(default)
}

/// Check if running in production mode.
pub fn is_production_env() -> bool {
    std::env::var("ENVIRONMENT")
        .map(|v| v.to_lowercase() == "production")
        .unwrap_or(false)
}

/// Detection service configuration.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Where result artifacts are written
    pub output_dir: PathBuf,
    /// Threshold used when a request supplies none
    pub confidence_threshold: f64,
    /// Path to the ONNX model
    pub model_path: String,
    /// Scratch directory for uploads; system temp dir when unset
    pub scratch_dir: Option<PathBuf>,
    /// Max request body size
    pub max_body_size: usize,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Environment (development/production)
    pub environment: String,
    /// Serve Prometheus metrics at /metrics
    pub metrics_enabled: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5001,
            output_dir: PathBuf::from("output"),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            model_path: ModelConfig::default().model_path,
            scratch_dir: None,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            cors_origins: vec!["*".to_string()],
            environment: "development".to_string(),
            metrics_enabled: true,
        }
    }
}

impl DetectorConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let confidence_raw = std::env::var("CONFIDENCE_THRESHOLD").ok();
        let confidence_threshold = match parse_confidence(confidence_raw.as_deref()) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Ignoring CONFIDENCE_THRESHOLD");
                defaults.confidence_threshold
            }
        };

        Self {
            host: env_or("DETECTOR_HOST", &defaults.host),
            port: env_parse("DETECTOR_PORT", defaults.port),
            output_dir: std::env::var("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            confidence_threshold,
            model_path: env_or("MODEL_PATH", &defaults.model_path),
            scratch_dir: std::env::var("SCRATCH_DIR")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            max_body_size: env_parse("MAX_BODY_SIZE", defaults.max_body_size),
            cors_origins: env_origins(),
            environment: env_or("ENVIRONMENT", &defaults.environment),
            metrics_enabled: env_flag("METRICS_ENABLED", defaults.metrics_enabled),
        }
    }

    pub fn model_config(&self) -> ModelConfig {
        ModelConfig {
            model_path: self.model_path.clone(),
            ..ModelConfig::default()
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }
}

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Detection service URL and timeouts
    pub client: DetectionClientConfig,
    /// Max request body size
    pub max_body_size: usize,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Environment (development/production)
    pub environment: String,
    /// Serve Prometheus metrics at /metrics
    pub metrics_enabled: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            client: DetectionClientConfig::default(),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            cors_origins: vec!["*".to_string()],
            environment: "development".to_string(),
            metrics_enabled: true,
        }
    }
}

impl GatewayConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: env_or("GATEWAY_HOST", &defaults.host),
            port: env_parse("GATEWAY_PORT", defaults.port),
            client: DetectionClientConfig::from_env(),
            max_body_size: env_parse("MAX_BODY_SIZE", defaults.max_body_size),
            cors_origins: env_origins(),
            environment: env_or("ENVIRONMENT", &defaults.environment),
            metrics_enabled: env_flag("METRICS_ENABLED", defaults.metrics_enabled),
        }
    }

    /// Reject a detection service URL that is not absolute http(s).
    pub fn validate(&self) -> Result<(), String> {
        let parsed = url::Url::parse(&self.client.base_url)
            .map_err(|e| format!("DETECTION_SERVICE_URL {:?}: {}", self.client.base_url, e))?;
        match parsed.scheme() {
            "http" | "https" => Ok(()),
            other => Err(format!("DETECTION_SERVICE_URL has unsupported scheme {:?}", other)),
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }
}
