//! 服务端配置
//!
//! 先读取配置文件（不存在则使用默认值），再用 `DRAUGHTS_*` 环境变量覆盖。

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use protocol::{Difficulty, MATCHMAKING_TIMEOUT_SECS, MAX_CONNECTIONS};

use crate::storage::{FileStore, GameStore, MemoryStore};

/// 存储后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// 进程内存，重启后丢失
    Memory,
    /// 数据目录下的 JSON 文件
    #[default]
    File,
}

/// 服务端配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 监听地址
    pub bind_addr: String,
    pub storage: StorageBackend,
    /// 对局文件目录，未设置时使用系统数据目录
    pub data_dir: Option<PathBuf>,
    pub matchmaking_timeout_secs: u64,
    pub bot_difficulty: Difficulty,
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:9000".to_string(),
            storage: StorageBackend::default(),
            data_dir: None,
            matchmaking_timeout_secs: MATCHMAKING_TIMEOUT_SECS,
            bot_difficulty: Difficulty::default(),
            max_connections: MAX_CONNECTIONS,
        }
    }
}

impl ServerConfig {
    /// 配置文件路径
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut path| {
            path.push("draughts");
            path.push("server.json");
            path
        })
    }

    /// 加载配置：配置文件 + 环境变量
    pub fn load() -> Result<Self> {
        let mut config = match Self::config_path() {
            Some(path) if path.exists() => {
                let config = Self::from_file(&path)?;
                info!("Loaded config from {:?}", path);
                config
            }
            _ => {
                info!("No config file, using defaults");
                Self::default()
            }
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// 从 JSON 文件读取
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
        serde_json::from_str(&content).with_context(|| format!("Invalid config file {:?}", path))
    }

    /// 用环境变量覆盖配置项
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(addr) = var("DRAUGHTS_BIND_ADDR") {
            self.bind_addr = addr;
        }
        if let Some(storage) = var("DRAUGHTS_STORAGE") {
            self.storage = match storage.to_lowercase().as_str() {
                "memory" => StorageBackend::Memory,
                "file" => StorageBackend::File,
                other => bail!("DRAUGHTS_STORAGE must be memory or file, got {:?}", other),
            };
        }
        if let Some(dir) = var("DRAUGHTS_DATA_DIR") {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(secs) = var("DRAUGHTS_MATCH_TIMEOUT_SECS") {
            self.matchmaking_timeout_secs = secs
                .parse()
                .with_context(|| format!("Invalid DRAUGHTS_MATCH_TIMEOUT_SECS {:?}", secs))?;
        }
        if let Some(difficulty) = var("DRAUGHTS_BOT_DIFFICULTY") {
            self.bot_difficulty = match difficulty.to_lowercase().as_str() {
                "easy" => Difficulty::Easy,
                "normal" => Difficulty::Normal,
                other => bail!("DRAUGHTS_BOT_DIFFICULTY must be easy or normal, got {:?}", other),
            };
        }
        if let Some(max) = var("DRAUGHTS_MAX_CONNECTIONS") {
            self.max_connections = max
                .parse()
                .with_context(|| format!("Invalid DRAUGHTS_MAX_CONNECTIONS {:?}", max))?;
        }
        Ok(())
    }

    /// 对局文件目录
    pub fn data_dir(&self) -> Option<PathBuf> {
        self.data_dir.clone().or_else(|| {
            dirs::data_dir().map(|mut path| {
                path.push("draughts");
                path.push("games");
                path
            })
        })
    }

    pub fn matchmaking_timeout(&self) -> Duration {
        Duration::from_secs(self.matchmaking_timeout_secs)
    }

    /// 按配置打开存储
    pub fn open_store(&self) -> Result<Arc<dyn GameStore>> {
        match self.storage {
            StorageBackend::Memory => Ok(Arc::new(MemoryStore::new())),
            StorageBackend::File => {
                let dir = self.data_dir().context("No data directory available")?;
                let store = FileStore::open(&dir).with_context(|| format!("Failed to open data dir {:?}", dir))?;
                info!("Storing games under {:?}", store.directory());
                Ok(Arc::new(store))
            }
        }
    }
}
