//! 服务端错误类型

use thiserror::Error;

use protocol::{ErrorCode, GameId, MoveError, StateError};

/// 存储错误
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// 记录内容与文件名不一致等
    #[error("Corrupt record for game {id}: {reason}")]
    Corrupt { id: GameId, reason: String },

    /// 持锁线程 panic 后锁被污染
    #[error("Lock poisoned")]
    Poisoned,
}

/// 对局操作错误
///
/// 三类错误都不会留下部分修改：校验和状态错误发生在修改之前，
/// 存储错误发生时修改只存在于内存副本中。
#[derive(Error, Debug)]
pub enum GameError {
    #[error(transparent)]
    Validation(#[from] MoveError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error("Storage failure: {0}")]
    Persistence(#[from] StorageError),
}

impl GameError {
    /// 返回给客户端的错误码
    pub fn code(&self) -> ErrorCode {
        match self {
            GameError::Validation(e) => e.code(),
            GameError::State(e) => e.code(),
            GameError::Persistence(_) => ErrorCode::StorageFailure,
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for StorageError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        StorageError::Poisoned
    }
}

impl<T> From<std::sync::PoisonError<T>> for GameError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        GameError::Persistence(StorageError::Poisoned)
    }
}

pub type Result<T> = std::result::Result<T, GameError>;
