//! 消息类型定义

use serde::{Deserialize, Serialize};

use crate::piece::Position;
use crate::record::{GameRecord, MoveRecord};

/// 玩家 ID（0 保留给机器人）
pub type PlayerId = u64;

/// 对局 ID
pub type GameId = u64;

/// 机器人难度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// 简单：在合法走法中随机选择（吃子优先）
    #[default]
    Easy,
    /// 普通：按局面评估贪心选择（吃子优先）
    Normal,
}

/// 请求上下文
///
/// 由外部身份服务解析后随每个请求显式传入，核心逻辑不读取任何全局会话状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    pub user_id: PlayerId,
}

impl RequestContext {
    pub fn new(user_id: PlayerId) -> Self {
        Self { user_id }
    }
}

/// 客户端请求：身份 + 消息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub context: RequestContext,
    pub message: ClientMessage,
}

impl Request {
    pub fn new(user_id: PlayerId, message: ClientMessage) -> Self {
        Self {
            context: RequestContext::new(user_id),
            message,
        }
    }
}

/// 客户端发送给服务端的消息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientMessage {
    // === 匹配 ===
    /// 加入匹配队列
    JoinQueue,
    /// 轮询匹配状态
    CheckQueue,
    /// 离开匹配队列
    LeaveQueue,
    /// 直接与机器人对局
    PlayBot,

    // === 对局操作 ===
    /// 走棋
    MakeMove {
        game_id: GameId,
        from: Position,
        to: Position,
    },
    /// 认输
    Resign { game_id: GameId },
    /// 获取对局状态
    GetGame { game_id: GameId },

    // === 心跳 ===
    /// 心跳请求
    Ping,
}

/// 匹配状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchStatus {
    /// 仍在等待
    Waiting { waited_secs: u64 },
    /// 已配对（对手可能是机器人）
    Matched { game_id: GameId, against_bot: bool },
    /// 不在队列中，也没有进行中的对局
    NotQueued,
}

/// 服务端发送给客户端的消息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ServerMessage {
    // === 匹配 ===
    /// 匹配状态
    Queue(MatchStatus),
    /// 已离开队列
    QueueLeft,

    // === 对局 ===
    /// 对局状态
    GameState(GameRecord),
    /// 走棋完成：最新对局状态，以及本次请求产生的所有走法（含机器人应招）
    MoveApplied {
        game: GameRecord,
        moves: Vec<MoveRecord>,
    },

    // === 心跳 ===
    /// 心跳响应
    Pong,

    // === 错误 ===
    /// 错误消息
    Error { code: ErrorCode, message: String },
}

/// 错误码定义
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u16)]
pub enum ErrorCode {
    // === 对局相关 (2xx) ===
    /// 不是你的回合
    NotYourTurn = 200,
    /// 无效走法
    InvalidMove = 201,
    /// 对局不存在
    GameNotFound = 202,
    /// 对局已结束
    GameAlreadyOver = 203,
    /// 不是对局参与者
    NotParticipant = 204,

    // === 匹配/玩家相关 (3xx) ===
    /// 已在队列中
    AlreadyQueued = 300,
    /// 玩家 ID 无效
    InvalidPlayer = 301,

    // === 系统相关 (5xx) ===
    /// 存储失败
    StorageFailure = 502,
}

impl ErrorCode {
    /// 数字错误码
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}
