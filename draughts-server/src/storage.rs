//! 对局存储
//!
//! 对局记录与走法日志作为一个 [`Game`] 文档整体读写。

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tracing::{error, warn};

use protocol::{GameId, GameRecord, PlayerId};

use crate::error::StorageError;
use crate::game::Game;

/// 持久化接口
pub trait GameStore: Send + Sync {
    /// 分配新的对局 ID
    fn next_id(&self) -> Result<GameId, StorageError>;

    /// 保存整个对局（记录 + 走法日志）
    fn save(&self, game: &Game) -> Result<(), StorageError>;

    /// 读取对局，不存在时返回 None
    fn load(&self, id: GameId) -> Result<Option<Game>, StorageError>;

    /// 玩家最近创建的进行中对局
    fn latest_in_progress(&self, user_id: PlayerId) -> Result<Option<GameRecord>, StorageError>;
}

/// 在候选记录中找出玩家最近创建的进行中对局
fn pick_latest<'a>(records: impl Iterator<Item = &'a GameRecord>, user_id: PlayerId) -> Option<GameRecord> {
    records
        .filter(|record| !record.is_finished() && record.is_participant(user_id))
        .max_by_key(|record| (record.created_at, record.id))
        .cloned()
}

// ============================================================================
// 内存存储
// ============================================================================

/// 内存存储（测试与单机运行）
pub struct MemoryStore {
    games: Mutex<HashMap<GameId, Game>>,
    next_id: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            games: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// 已保存的对局数量
    pub fn len(&self) -> usize {
        self.games.lock().map(|games| games.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GameStore for MemoryStore {
    fn next_id(&self) -> Result<GameId, StorageError> {
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn save(&self, game: &Game) -> Result<(), StorageError> {
        self.games.lock()?.insert(game.id(), game.clone());
        Ok(())
    }

    fn load(&self, id: GameId) -> Result<Option<Game>, StorageError> {
        Ok(self.games.lock()?.get(&id).cloned())
    }

    fn latest_in_progress(&self, user_id: PlayerId) -> Result<Option<GameRecord>, StorageError> {
        let games = self.games.lock()?;
        Ok(pick_latest(games.values().map(|game| &game.record), user_id))
    }
}

// ============================================================================
// 文件存储
// ============================================================================

/// 文件存储：数据目录下每局一个 JSON 文件 `game-<id>.json`
///
/// 对局记录在内存中另有一份索引，查询进行中的对局不读盘。
pub struct FileStore {
    dir: PathBuf,
    /// 下一个可用 ID，启动时扫描目录得到
    next_id: Mutex<GameId>,
    /// 对局 ID -> 最近保存的对局记录
    records: Mutex<HashMap<GameId, GameRecord>>,
}

impl FileStore {
    /// 打开数据目录（不存在则创建），读取已有对局建立索引
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let ids = Self::stored_ids(&dir)?;
        let max_id = ids.iter().copied().max().unwrap_or(0);
        let store = Self {
            dir,
            next_id: Mutex::new(max_id + 1),
            records: Mutex::new(HashMap::new()),
        };

        let mut records = HashMap::new();
        for id in ids {
            match store.read(id) {
                Ok(Some(game)) => {
                    records.insert(id, game.record);
                }
                Ok(None) => {}
                // 跳过损坏的文件
                Err(e) => warn!("Skipping game {}: {}", id, e),
            }
        }
        *store.records.lock()? = records;
        Ok(store)
    }

    /// 数据目录
    pub fn directory(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: GameId) -> PathBuf {
        self.dir.join(format!("game-{}.json", id))
    }

    /// 从文件名解析对局 ID
    fn parse_id(path: &Path) -> Option<GameId> {
        path.file_name()?
            .to_str()?
            .strip_prefix("game-")?
            .strip_suffix(".json")?
            .parse()
            .ok()
    }

    fn stored_ids(dir: &Path) -> Result<Vec<GameId>, StorageError> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(dir)? {
            if let Some(id) = Self::parse_id(&entry?.path()) {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    fn read(&self, id: GameId) -> Result<Option<Game>, StorageError> {
        let path = self.path_for(id);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)?;
        let game: Game = serde_json::from_str(&content).map_err(|e| {
            error!("Failed to parse {:?}: {}", path, e);
            StorageError::Corrupt {
                id,
                reason: e.to_string(),
            }
        })?;

        if game.id() != id {
            return Err(StorageError::Corrupt {
                id,
                reason: format!("file holds game {}", game.id()),
            });
        }
        Ok(Some(game))
    }
}

impl GameStore for FileStore {
    fn next_id(&self) -> Result<GameId, StorageError> {
        let mut next = self.next_id.lock()?;
        let id = *next;
        *next += 1;
        Ok(id)
    }

    fn save(&self, game: &Game) -> Result<(), StorageError> {
        let path = self.path_for(game.id());
        let tmp = path.with_extension("json.tmp");

        // 先写临时文件再重命名，读者不会看到写了一半的文件
        let content = serde_json::to_string_pretty(game)?;
        fs::write(&tmp, content).map_err(|e| {
            error!("Failed to write {:?}: {}", tmp, e);
            StorageError::Io(e)
        })?;
        fs::rename(&tmp, &path)?;

        self.records.lock()?.insert(game.id(), game.record.clone());
        Ok(())
    }

    fn load(&self, id: GameId) -> Result<Option<Game>, StorageError> {
        self.read(id)
    }

    fn latest_in_progress(&self, user_id: PlayerId) -> Result<Option<GameRecord>, StorageError> {
        let records = self.records.lock()?;
        Ok(pick_latest(records.values(), user_id))
    }
}
