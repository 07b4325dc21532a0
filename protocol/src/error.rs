//! 错误类型定义

use thiserror::Error;

use crate::message::{ErrorCode, GameId};

/// 走法校验错误（ValidationError），不会修改任何状态
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MoveError {
    /// 坐标越界
    #[error("Position ({row}, {col}) is off the board")]
    OutOfBounds { row: u8, col: u8 },

    /// 起点与终点相同
    #[error("Source and destination are the same square")]
    SameSquare,

    /// 起点没有棋子
    #[error("No piece at ({row}, {col})")]
    NoPiece { row: u8, col: u8 },

    /// 起点棋子不属于走子方
    #[error("Piece at ({row}, {col}) belongs to the opponent")]
    NotYourPiece { row: u8, col: u8 },

    /// 终点已有棋子
    #[error("Destination ({row}, {col}) is occupied")]
    DestinationOccupied { row: u8, col: u8 },

    /// 不是斜线走法
    #[error("Pieces move diagonally only")]
    NotDiagonal,

    /// 存在可吃子时必须吃子
    #[error("A capture is available and must be taken")]
    CaptureRequired,

    /// 兵不能后退
    #[error("Pawns may only move forward")]
    PawnBackward,

    /// 兵一次最多跳两格
    #[error("Pawns move one square or jump two")]
    PawnTooFar,

    /// 兵跳过的格子没有对方棋子
    #[error("No opposing piece to jump over")]
    NothingToCapture,

    /// 王的路径被挡住
    #[error("King path is blocked")]
    KingPathBlocked,

    /// 连吃必须由同一枚棋子继续
    #[error("Capture chain must continue with the piece at ({row}, {col})")]
    ChainInProgress { row: u8, col: u8 },
}

/// 对局状态错误（StateError），不会修改任何状态
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    /// 不是你的回合
    #[error("Not your turn")]
    NotYourTurn,

    /// 对局已结束
    #[error("Game is already over")]
    GameFinished,

    /// 对局不存在
    #[error("Game {0} not found")]
    GameNotFound(GameId),

    /// 不是该对局的参与者
    #[error("Not a participant of this game")]
    NotParticipant,

    /// 已在匹配队列中
    #[error("Already waiting in the matchmaking queue")]
    AlreadyQueued,

    /// 保留 ID（机器人）不能作为真实玩家
    #[error("Player id {0} is reserved")]
    ReservedPlayer(u64),
}

impl MoveError {
    pub fn code(&self) -> ErrorCode {
        ErrorCode::InvalidMove
    }
}

impl StateError {
    pub fn code(&self) -> ErrorCode {
        match self {
            StateError::NotYourTurn => ErrorCode::NotYourTurn,
            StateError::GameFinished => ErrorCode::GameAlreadyOver,
            StateError::GameNotFound(_) => ErrorCode::GameNotFound,
            StateError::NotParticipant => ErrorCode::NotParticipant,
            StateError::AlreadyQueued => ErrorCode::AlreadyQueued,
            StateError::ReservedPlayer(_) => ErrorCode::InvalidPlayer,
        }
    }
}

/// 协议错误类型
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// IO 错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 序列化错误（bincode）
    #[error("Bincode serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// JSON 序列化错误
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// 协议版本不匹配
    #[error("Protocol version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: u8, actual: u8 },

    /// 帧大小超限
    #[error("Frame too large: {size} bytes (max: {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// 连接超时
    #[error("Connection timeout")]
    ConnectionTimeout,

    /// 连接已关闭
    #[error("Connection closed")]
    ConnectionClosed,

    /// 执棋方编号无效
    #[error("Invalid player number: {0}")]
    InvalidPlayer(u8),

    /// 棋盘编码无效
    #[error("Invalid board encoding: {reason}")]
    InvalidBoard { reason: String },
}

/// 协议操作结果类型
pub type Result<T> = std::result::Result<T, ProtocolError>;
