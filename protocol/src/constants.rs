//! 协议常量定义

use std::time::Duration;

/// 协议版本号
pub const PROTOCOL_VERSION: u8 = 1;

/// 棋盘边长（行数 = 列数）
pub const BOARD_SIZE: usize = 8;

/// 开局时每方摆放棋子的行数
pub const STARTING_ROWS: usize = 3;

/// 消息帧最大大小
pub const MAX_FRAME_SIZE: usize = 65536;

/// 服务端最大连接数
pub const MAX_CONNECTIONS: usize = 100;

/// 连接超时（秒）
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// 机器人玩家 ID（player2_id 为 0 表示对手是机器人，真实玩家 ID 从 1 开始）
pub const BOT_PLAYER_ID: u64 = 0;

/// 匹配等待超时（秒），超时仍未配对则改为与机器人对局
pub const MATCHMAKING_TIMEOUT_SECS: u64 = 15;

/// 连接超时 Duration
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(CONNECT_TIMEOUT_SECS);

/// 匹配等待超时 Duration
pub const MATCHMAKING_TIMEOUT: Duration = Duration::from_secs(MATCHMAKING_TIMEOUT_SECS);
