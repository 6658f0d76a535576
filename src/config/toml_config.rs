use crate::core::recalculator::MAX_BATCH_SIZE;
use crate::core::{ConfigProvider, FieldMapping};
use crate::utils::error::{EstimatorError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub server: ServerConfig,
    pub azure_devops: AzureDevOpsConfig,
    pub fields: FieldMapping,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AzureDevOpsConfig {
    pub organization_url: String,
    pub api_version: String,
    pub timeout_seconds: u64,
    pub page_size: usize,
    pub batch_size: usize,
    pub target_projects: Vec<String>,
}

impl Default for AzureDevOpsConfig {
    fn default() -> Self {
        Self {
            organization_url: "https://dev.azure.com/CorporacionRutaN".to_string(),
            api_version: "7.0".to_string(),
            timeout_seconds: 30,
            page_size: 100,
            batch_size: MAX_BATCH_SIZE,
            target_projects: vec!["CATI".to_string()],
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub verbose: bool,
    pub format: LogFormat,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EstimatorError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${AZURE_DEVOPS_ORG_URL})，未設定的保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| EstimatorError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl ConfigProvider for TomlConfig {
    fn organization_url(&self) -> &str {
        &self.azure_devops.organization_url
    }

    fn api_version(&self) -> &str {
        &self.azure_devops.api_version
    }

    fn timeout_seconds(&self) -> u64 {
        self.azure_devops.timeout_seconds
    }

    fn page_size(&self) -> usize {
        self.azure_devops.page_size
    }

    fn batch_size(&self) -> usize {
        self.azure_devops.batch_size
    }

    fn target_projects(&self) -> &[String] {
        &self.azure_devops.target_projects
    }

    fn fields(&self) -> &FieldMapping {
        &self.fields
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_non_empty_string("server.host", &self.server.host)?;
        validation::validate_positive_number("server.port", self.server.port as u64, 1)?;

        let ado = &self.azure_devops;
        validation::validate_url("azure_devops.organization_url", &ado.organization_url)?;
        validation::validate_non_empty_string("azure_devops.api_version", &ado.api_version)?;
        validation::validate_positive_number("azure_devops.timeout_seconds", ado.timeout_seconds, 1)?;
        validation::validate_positive_number("azure_devops.page_size", ado.page_size as u64, 1)?;
        validation::validate_range("azure_devops.batch_size", ado.batch_size, 1, MAX_BATCH_SIZE)?;
        for project in &ado.target_projects {
            validation::validate_non_empty_string("azure_devops.target_projects", project)?;
        }

        validation::validate_field_reference("fields.quantity", &self.fields.quantity)?;
        validation::validate_field_reference("fields.months", &self.fields.months)?;
        validation::validate_field_reference("fields.unit_value", &self.fields.unit_value)?;
        validation::validate_field_reference("fields.total", &self.fields.total)?;

        Ok(())
    }
}
