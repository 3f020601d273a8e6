use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use config::builder::DefaultState;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 默认配置文件 (不存在时忽略)
const DEFAULT_CONFIG_FILE: &str = "config/app";

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    pub document: DocumentConfig,
    pub import: ImportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// 管理接口令牌; 未配置时所有管理接口拒绝访问
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminConfig {
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentConfig {
    pub filename_prefix: String,
    /// 页眉图片 (JPEG)
    #[serde(default)]
    pub logo_path: Option<PathBuf>,
}

/// ERP 导出表格的列名映射
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    pub registry_tax_id_column: String,
    pub registry_buyer_code_column: String,
    pub ledger_buyer_code_column: String,
    pub ledger_due_date_column: String,
    pub ledger_settlement_column: String,
    pub ledger_amount_column: String,
    /// 导入请求体上限 (字节)
    pub max_body_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                url: "postgres://localhost/order_release".to_string(),
                max_connections: 20,
            },
            admin: AdminConfig::default(),
            document: DocumentConfig {
                filename_prefix: "Ordem_Compra".to_string(),
                logo_path: None,
            },
            import: ImportConfig::default(),
        }
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            registry_tax_id_column: "Número CNPJ".to_string(),
            registry_buyer_code_column: "Cliente".to_string(),
            ledger_buyer_code_column: "Cliente".to_string(),
            ledger_due_date_column: "Data base".to_string(),
            ledger_settlement_column: "Compensaç.".to_string(),
            ledger_amount_column: "Montante em MI".to_string(),
            max_body_bytes: 64 * 1024 * 1024,
        }
    }
}

impl AppConfig {
    /// 加载配置: 默认值 → 配置文件 → APP__ 环境变量 → 兼容旧环境变量
    pub fn load() -> Result<Self, ConfigError> {
        let file = std::env::var("APP_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());

        defaults()?
            .add_source(File::with_name(&file).required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .set_override_option("server.host", std::env::var("SERVER_HOST").ok())?
            .set_override_option(
                "server.port",
                std::env::var("SERVER_PORT").ok().and_then(|p| p.parse::<i64>().ok()),
            )?
            .set_override_option("admin.token", std::env::var("ADMIN_TOKEN").ok())?
            .build()?
            .try_deserialize()
    }

    /// 仅从指定文件加载 (缺省项取默认值)
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        defaults()?
            .add_source(File::from(path).required(true))
            .build()?
            .try_deserialize()
    }
}

fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let d = AppConfig::default();
    Config::builder()
        .set_default("server.host", d.server.host)?
        .set_default("server.port", i64::from(d.server.port))?
        .set_default("database.url", d.database.url)?
        .set_default("database.max_connections", i64::from(d.database.max_connections))?
        .set_default("document.filename_prefix", d.document.filename_prefix)?
        .set_default("import.registry_tax_id_column", d.import.registry_tax_id_column)?
        .set_default("import.registry_buyer_code_column", d.import.registry_buyer_code_column)?
        .set_default("import.ledger_buyer_code_column", d.import.ledger_buyer_code_column)?
        .set_default("import.ledger_due_date_column", d.import.ledger_due_date_column)?
        .set_default("import.ledger_settlement_column", d.import.ledger_settlement_column)?
        .set_default("import.ledger_amount_column", d.import.ledger_amount_column)?
        .set_default("import.max_body_bytes", d.import.max_body_bytes as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn file_overrides_only_what_it_names() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9090

[admin]
token = "segredo"

[import]
ledger_due_date_column = "Vencimento"
"#
        )
        .unwrap();

        let cfg = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(cfg.server.port, 9090);
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.admin.token.as_deref(), Some("segredo"));
        assert_eq!(cfg.import.ledger_due_date_column, "Vencimento");
        assert_eq!(cfg.import.ledger_settlement_column, "Compensaç.");
        assert_eq!(cfg.import.max_body_bytes, 64 * 1024 * 1024);
        assert_eq!(cfg.document.filename_prefix, "Ordem_Compra");
        assert!(cfg.document.logo_path.is_none());
    }
}
