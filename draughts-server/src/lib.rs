//! 国际跳棋服务端
//!
//! 包含:
//! - 对局引擎（走棋、机器人应招、胜负判定）
//! - 匹配队列
//! - 棋局存储
//! - 配置与 TCP 服务

pub mod config;
pub mod engine;
pub mod error;
pub mod game;
pub mod matchmaking;
pub mod server;
pub mod storage;

pub use config::{ServerConfig, StorageBackend};
pub use engine::{GameEvents, LogEvents, MoveReport, TurnEngine};
pub use error::{GameError, StorageError};
pub use game::{Game, MoveOutcome};
pub use matchmaking::{Clock, Matchmaker, SystemClock};
pub use server::{MessageHandler, Server, ServerState};
pub use storage::{FileStore, GameStore, MemoryStore};
