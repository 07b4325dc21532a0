//! 国际跳棋（8x8）共享协议库
//!
//! 包含:
//! - 棋子、棋盘、位置等核心数据结构
//! - 走法校验与生成（强制吃子、王的远距离吃子）
//! - 持久化记录 (GameRecord, MoveRecord, QueueRecord)
//! - 消息类型定义 (Request, ClientMessage, ServerMessage)
//! - 传输层抽象与帧编解码

mod board;
mod constants;
mod error;
mod message;
mod moves;
mod piece;
mod record;
mod transport;

pub use board::{Board, BoardEncoding, Cell};
pub use constants::*;
pub use error::{MoveError, ProtocolError, Result, StateError};
pub use message::{
    ClientMessage, Difficulty, ErrorCode, GameId, MatchStatus, PlayerId, Request, RequestContext, ServerMessage,
};
pub use moves::{Move, MoveValidator};
pub use piece::{Piece, Player, Position, Rank};
pub use record::{EndReason, GameRecord, GameResult, GameStatus, MoveRecord, QueueRecord};
pub use transport::{
    Connection, Connector, FrameReader, FrameWriter, Listener, TcpConnection, TcpConnector, TcpListener,
};
