use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// 宿主平台（CMS）访问配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// 站点基础URL，用于拼接回调地址和平台Action接口地址
    pub site_url: String,
    /// 调用平台接口与下发给工作进程的API凭证
    pub api_key: String,
    pub request_timeout_seconds: u64,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            site_url: "http://localhost:5000".to_string(),
            api_key: "".to_string(),
            request_timeout_seconds: 30,
        }
    }
}

impl PlatformConfig {
    pub fn validate(&self) -> Result<()> {
        validate_not_empty(&self.site_url, "platform.site_url")?;
        if !self.site_url.starts_with("http://") && !self.site_url.starts_with("https://") {
            anyhow::bail!("platform.site_url 必须以 http:// 或 https:// 开头");
        }
        validate_timeout_seconds(self.request_timeout_seconds, "platform.request_timeout_seconds")
    }
}

/// 入库任务编排配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// 入库作业投递的队列名
    pub queue_name: String,
    /// pending任务超过该秒数视为已被遗弃，允许重新提交
    pub assume_task_stale_after: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            queue_name: "shift".to_string(),
            assume_task_stale_after: 3600,
        }
    }
}

impl IngestConfig {
    pub fn validate(&self) -> Result<()> {
        validate_not_empty(&self.queue_name, "ingest.queue_name")?;
        if self.assume_task_stale_after == 0 {
            anyhow::bail!("ingest.assume_task_stale_after 必须大于0");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connection_timeout_seconds: u64,
    pub idle_timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:shift.db".to_string(),
            max_connections: 10,
            min_connections: 1,
            connection_timeout_seconds: 30,
            idle_timeout_seconds: 600,
        }
    }
}

impl DatabaseConfig {
    pub fn validate(&self) -> Result<()> {
        validate_not_empty(&self.url, "database.url")?;
        if self.max_connections == 0 {
            anyhow::bail!("database.max_connections 必须大于0");
        }
        if self.min_connections > self.max_connections {
            anyhow::bail!("database.min_connections 不能大于 max_connections");
        }
        validate_timeout_seconds(
            self.connection_timeout_seconds,
            "database.connection_timeout_seconds",
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum JobQueueType {
    Rabbitmq,
    RedisStream,
    InMemory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub database: i32,
    pub password: Option<String>,
    pub connection_timeout_seconds: u64,
    pub max_retry_attempts: u32,
    pub retry_delay_seconds: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            database: 0,
            password: None,
            connection_timeout_seconds: 30,
            max_retry_attempts: 3,
            retry_delay_seconds: 5,
        }
    }
}

impl RedisConfig {
    pub fn validate(&self) -> Result<()> {
        validate_not_empty(&self.host, "job_queue.redis.host")?;
        if self.port == 0 {
            anyhow::bail!("job_queue.redis.port 必须大于0");
        }
        if self.max_retry_attempts == 0 {
            anyhow::bail!("job_queue.redis.max_retry_attempts 必须大于0");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobQueueConfig {
    pub r#type: JobQueueType,
    pub url: String,
    pub redis: Option<RedisConfig>,
    pub max_retries: u32,
    pub retry_delay_seconds: u64,
    pub connection_timeout_seconds: u64,
}

impl Default for JobQueueConfig {
    fn default() -> Self {
        Self {
            r#type: JobQueueType::InMemory,
            url: "".to_string(), // 内存队列不需要URL
            redis: None,
            max_retries: 3,
            retry_delay_seconds: 5,
            connection_timeout_seconds: 30,
        }
    }
}

impl JobQueueConfig {
    pub fn validate(&self) -> Result<()> {
        match self.r#type {
            JobQueueType::Rabbitmq => {
                validate_not_empty(&self.url, "job_queue.url")?;
                if !self.url.starts_with("amqp://") && !self.url.starts_with("amqps://") {
                    anyhow::bail!("RabbitMQ URL 必须以 amqp:// 或 amqps:// 开头");
                }
            }
            JobQueueType::RedisStream => {
                if self.redis.is_none()
                    && (self.url.is_empty()
                        || (!self.url.starts_with("redis://")
                            && !self.url.starts_with("rediss://")))
                {
                    anyhow::bail!("Redis Stream 需要提供 redis 配置段或有效的 Redis URL");
                }
                if let Some(redis) = &self.redis {
                    redis.validate()?;
                }
            }
            JobQueueType::InMemory => {
                // 内存队列不需要外部连接配置
            }
        }
        if self.max_retries == 0 {
            anyhow::bail!("job_queue.max_retries 必须大于0");
        }
        Ok(())
    }

    pub fn parse_type_string(type_str: &str) -> Result<JobQueueType> {
        match type_str.to_lowercase().as_str() {
            "rabbitmq" => Ok(JobQueueType::Rabbitmq),
            "redis_stream" => Ok(JobQueueType::RedisStream),
            "in_memory" => Ok(JobQueueType::InMemory),
            _ => anyhow::bail!(
                "不支持的作业队列类型: {type_str}，支持的类型: rabbitmq, redis_stream, in_memory"
            ),
        }
    }

    pub fn get_type_string(&self) -> &'static str {
        match self.r#type {
            JobQueueType::Rabbitmq => "rabbitmq",
            JobQueueType::RedisStream => "redis_stream",
            JobQueueType::InMemory => "in_memory",
        }
    }
}

/// API密钥条目，键为密钥本身
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyEntry {
    pub name: String,
    pub permissions: Vec<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    pub enabled: bool,
    pub api_keys: HashMap<String, ApiKeyEntry>,
}

impl AuthSettings {
    pub fn validate(&self) -> Result<()> {
        if self.enabled && self.api_keys.is_empty() {
            anyhow::bail!("启用认证时 api.auth.api_keys 至少需要配置一个密钥");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub bind_address: String,
    pub cors_enabled: bool,
    pub cors_origins: Vec<String>,
    pub request_timeout_seconds: u64,
    pub auth: AuthSettings,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            cors_enabled: true,
            cors_origins: vec!["*".to_string()],
            request_timeout_seconds: 30,
            auth: AuthSettings::default(),
        }
    }
}

impl ApiConfig {
    pub fn validate(&self) -> Result<()> {
        self.bind_address
            .parse::<std::net::SocketAddr>()
            .map_err(|e| anyhow::anyhow!("api.bind_address 无效: {e}"))?;
        validate_timeout_seconds(self.request_timeout_seconds, "api.request_timeout_seconds")?;
        self.auth.validate()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub log_level: String,
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

impl ObservabilityConfig {
    pub fn validate(&self) -> Result<()> {
        const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
        if !LEVELS.contains(&self.log_level.as_str()) {
            anyhow::bail!("observability.log_level 无效: {}", self.log_level);
        }
        if self.log_format != "pretty" && self.log_format != "json" {
            anyhow::bail!("observability.log_format 只支持 pretty 或 json");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub platform: PlatformConfig,
    pub ingest: IngestConfig,
    pub database: DatabaseConfig,
    pub job_queue: JobQueueConfig,
    pub api: ApiConfig,
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_path {
            if Path::new(path).exists() {
                builder = builder.add_source(File::new(path, FileFormat::Toml));
            } else {
                return Err(anyhow::anyhow!("配置文件不存在: {}", path));
            }
        } else {
            let default_paths = ["config/shift.toml", "shift.toml", "/etc/shift/config.toml"];

            let mut config_file_found = false;
            for path in &default_paths {
                if Path::new(path).exists() {
                    builder = builder.add_source(File::new(path, FileFormat::Toml));
                    config_file_found = true;
                    break;
                }
            }

            if !config_file_found {
                builder = builder
                    .set_default("platform.site_url", "http://localhost:5000")?
                    .set_default("platform.api_key", "")?
                    .set_default("platform.request_timeout_seconds", 30)?
                    .set_default("ingest.queue_name", "shift")?
                    .set_default("ingest.assume_task_stale_after", 3600)?
                    .set_default("database.url", "sqlite:shift.db")?
                    .set_default("database.max_connections", 10)?
                    .set_default("database.min_connections", 1)?
                    .set_default("database.connection_timeout_seconds", 30)?
                    .set_default("database.idle_timeout_seconds", 600)?
                    .set_default("job_queue.url", "")?
                    .set_default("job_queue.max_retries", 3)?
                    .set_default("job_queue.retry_delay_seconds", 5)?
                    .set_default("job_queue.connection_timeout_seconds", 30)?
                    .set_default("api.bind_address", "0.0.0.0:8080")?
                    .set_default("api.cors_enabled", true)?
                    .set_default("api.cors_origins", vec!["*"])?
                    .set_default("api.request_timeout_seconds", 30)?
                    .set_default("api.auth.enabled", false)?
                    .set_default("observability.log_level", "info")?
                    .set_default("observability.log_format", "pretty")?;
            }
        }

        // 层级分隔符用双下划线，否则带下划线的字段名（如site_url）无法从环境变量设置
        builder = builder.add_source(
            Environment::with_prefix("SHIFT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = builder
            .build()
            .context("构建配置失败")?
            .try_deserialize()
            .context("反序列化配置失败")?;

        config.validate()?;

        Ok(config)
    }

    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(toml_str).context("解析TOML配置失败")?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("序列化配置为TOML失败")
    }

    pub fn validate(&self) -> Result<()> {
        self.platform.validate()?;
        self.ingest.validate()?;
        self.database.validate()?;
        self.job_queue.validate()?;
        self.api.validate()?;
        self.observability.validate()?;
        Ok(())
    }
}

fn validate_not_empty(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{field} 不能为空");
    }
    Ok(())
}

fn validate_timeout_seconds(value: u64, field: &str) -> Result<()> {
    if value == 0 {
        anyhow::bail!("{field} 必须大于0");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();
        assert_eq!(config.platform.site_url, "http://localhost:5000");
        assert_eq!(config.ingest.queue_name, "shift");
        assert_eq!(config.ingest.assume_task_stale_after, 3600);
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.api.bind_address, "0.0.0.0:8080");
        assert_eq!(config.job_queue.r#type, JobQueueType::InMemory);
    }

    #[test]
    fn test_app_config_validation() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_site_url_rejected() {
        let mut config = AppConfig::default();
        config.platform.site_url = "ftp://example.org".to_string();
        assert!(config.validate().is_err());

        config.platform.site_url = "".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_staleness_window_rejected() {
        let mut config = AppConfig::default();
        config.ingest.assume_task_stale_after = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_auth_enabled_requires_keys() {
        let mut config = AppConfig::default();
        config.api.auth.enabled = true;
        assert!(config.validate().is_err());

        config.api.auth.api_keys.insert(
            "test-key".to_string(),
            ApiKeyEntry {
                name: "test".to_string(),
                permissions: vec!["ingest_submit".to_string()],
                is_active: true,
            },
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_job_queue_config_validation() {
        let rabbitmq = JobQueueConfig {
            r#type: JobQueueType::Rabbitmq,
            url: "amqp://localhost:5672".to_string(),
            redis: None,
            max_retries: 3,
            retry_delay_seconds: 5,
            connection_timeout_seconds: 30,
        };
        assert!(rabbitmq.validate().is_ok());

        let mut invalid = rabbitmq.clone();
        invalid.url = "invalid://localhost:5672".to_string();
        assert!(invalid.validate().is_err());

        let redis_with_url = JobQueueConfig {
            r#type: JobQueueType::RedisStream,
            url: "redis://localhost:6379".to_string(),
            redis: None,
            ..JobQueueConfig::default()
        };
        assert!(redis_with_url.validate().is_ok());

        let redis_missing = JobQueueConfig {
            r#type: JobQueueType::RedisStream,
            url: "".to_string(),
            redis: None,
            ..JobQueueConfig::default()
        };
        assert!(redis_missing.validate().is_err());
    }

    #[test]
    fn test_job_queue_type_parsing() {
        assert_eq!(
            JobQueueConfig::parse_type_string("rabbitmq").unwrap(),
            JobQueueType::Rabbitmq
        );
        assert_eq!(
            JobQueueConfig::parse_type_string("REDIS_STREAM").unwrap(),
            JobQueueType::RedisStream
        );
        assert_eq!(
            JobQueueConfig::parse_type_string("in_memory").unwrap(),
            JobQueueType::InMemory
        );
        assert!(JobQueueConfig::parse_type_string("kafka").is_err());
    }

    #[test]
    fn test_app_config_from_toml() {
        let toml_str = r#"
[platform]
site_url = "https://data.example.org"
api_key = "ck-0001"
request_timeout_seconds = 10

[ingest]
queue_name = "shift"
assume_task_stale_after = 600

[database]
url = "postgresql://localhost/shift"
max_connections = 20
min_connections = 2
connection_timeout_seconds = 30
idle_timeout_seconds = 600

[job_queue]
type = "RedisStream"
url = "redis://localhost:6379"
max_retries = 3
retry_delay_seconds = 5
connection_timeout_seconds = 30

[api]
bind_address = "0.0.0.0:9000"
cors_enabled = true
cors_origins = ["*"]
request_timeout_seconds = 30

[api.auth]
enabled = false
api_keys = {}

[observability]
log_level = "debug"
log_format = "json"
"#;

        let config = AppConfig::from_toml(toml_str).expect("Failed to parse TOML");
        assert_eq!(config.platform.site_url, "https://data.example.org");
        assert_eq!(config.ingest.assume_task_stale_after, 600);
        assert_eq!(config.database.max_connections, 20);
        assert_eq!(config.job_queue.r#type, JobQueueType::RedisStream);
        assert_eq!(config.api.bind_address, "0.0.0.0:9000");
        assert_eq!(config.observability.log_level, "debug");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml_str = r#"
[platform]
site_url = "https://data.example.org"
"#;
        let config = AppConfig::from_toml(toml_str).expect("Failed to parse partial TOML");
        assert_eq!(config.platform.site_url, "https://data.example.org");
        assert_eq!(config.ingest.assume_task_stale_after, 3600);
        assert_eq!(config.job_queue.r#type, JobQueueType::InMemory);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = AppConfig::default();
        let serialized = config.to_toml().expect("Failed to serialize");
        let parsed = AppConfig::from_toml(&serialized).expect("Failed to re-parse");
        assert_eq!(parsed.platform.site_url, config.platform.site_url);
        assert_eq!(
            parsed.ingest.assume_task_stale_after,
            config.ingest.assume_task_stale_after
        );
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
        writeln!(
            file,
            r#"
[platform]
site_url = "https://portal.example.org"

[ingest]
assume_task_stale_after = 120
"#
        )
        .expect("Failed to write temp file");

        let config =
            AppConfig::load(Some(file.path().to_str().unwrap())).expect("Failed to load config");
        assert_eq!(config.platform.site_url, "https://portal.example.org");
        assert_eq!(config.ingest.assume_task_stale_after, 120);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let result = AppConfig::load(Some("/nonexistent/shift.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_env_variable_overrides_default() {
        std::env::remove_var("SHIFT_DATABASE__URL");
        std::env::set_var("SHIFT_DATABASE__URL", "postgresql://env-host/shift");

        let config = AppConfig::load(None).expect("Failed to load config");
        std::env::remove_var("SHIFT_DATABASE__URL");

        assert_eq!(config.database.url, "postgresql://env-host/shift");
    }

    #[test]
    fn test_env_variable_overrides_config_file() {
        let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
        writeln!(
            file,
            r#"
[api]
bind_address = "0.0.0.0:7000"
"#
        )
        .expect("Failed to write temp file");

        // 环境变量源在文件源之后加入，应当覆盖文件值
        std::env::remove_var("SHIFT_API__BIND_ADDRESS");
        std::env::set_var("SHIFT_API__BIND_ADDRESS", "0.0.0.0:9100");
        let config =
            AppConfig::load(Some(file.path().to_str().unwrap())).expect("Failed to load config");
        std::env::remove_var("SHIFT_API__BIND_ADDRESS");

        assert_eq!(config.api.bind_address, "0.0.0.0:9100");
    }
}
