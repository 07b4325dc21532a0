//! 服务器主逻辑
//!
//! [`MessageHandler`] 是同步的请求处理入口；[`Server`] 在 TCP 上收发帧，
//! 每个请求在 `block_in_place` 中交给处理器。

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use protocol::{
    ClientMessage, Connection, GameId, Listener, PlayerId, ProtocolError, Request, ServerMessage, StateError,
    TcpConnection, TcpListener,
};

use crate::config::ServerConfig;
use crate::engine::TurnEngine;
use crate::error::{GameError, Result};
use crate::matchmaking::Matchmaker;
use crate::storage::GameStore;

/// 服务器状态
pub struct ServerState {
    pub engine: Arc<TurnEngine>,
    pub matchmaker: Matchmaker,
    pub config: ServerConfig,
}

impl ServerState {
    pub fn new(config: ServerConfig, store: Arc<dyn GameStore>) -> Self {
        let engine = Arc::new(TurnEngine::new(store, draughts_ai::from_difficulty(config.bot_difficulty)));
        let matchmaker = Matchmaker::new(engine.clone()).with_timeout(config.matchmaking_timeout());
        Self {
            engine,
            matchmaker,
            config,
        }
    }

    /// 按配置打开存储并创建状态
    pub fn from_config(config: ServerConfig) -> anyhow::Result<Self> {
        let store = config.open_store()?;
        Ok(Self::new(config, store))
    }
}

/// 消息处理器
pub struct MessageHandler;

impl MessageHandler {
    /// 处理客户端请求，错误转换为 [`ServerMessage::Error`]
    pub fn handle(state: &ServerState, request: Request) -> ServerMessage {
        let user_id = request.context.user_id;

        let result = match request.message {
            ClientMessage::JoinQueue => state.matchmaker.join(user_id).map(ServerMessage::Queue),
            ClientMessage::CheckQueue => state.matchmaker.check(user_id).map(ServerMessage::Queue),
            ClientMessage::LeaveQueue => state.matchmaker.leave(user_id).map(|_| ServerMessage::QueueLeft),
            ClientMessage::PlayBot => Self::handle_play_bot(state, user_id),
            ClientMessage::MakeMove { game_id, from, to } => state
                .engine
                .apply_move(game_id, user_id, from, to)
                .map(|report| ServerMessage::MoveApplied {
                    game: report.game,
                    moves: report.moves,
                }),
            ClientMessage::Resign { game_id } => state.engine.resign(game_id, user_id).map(ServerMessage::GameState),
            ClientMessage::GetGame { game_id } => Self::handle_get_game(state, user_id, game_id),
            ClientMessage::Ping => Ok(ServerMessage::Pong),
        };

        result.unwrap_or_else(|e| {
            warn!("Request from {} failed ({}): {}", user_id, e.code().as_u16(), e);
            Self::error_message(&e)
        })
    }

    /// 直接与机器人对局，同时退出匹配队列
    fn handle_play_bot(state: &ServerState, user_id: PlayerId) -> Result<ServerMessage> {
        state.matchmaker.leave(user_id)?;
        let game = state.engine.create_bot_game(user_id)?;
        Ok(ServerMessage::GameState(game))
    }

    /// 只有参与者能查看对局
    fn handle_get_game(state: &ServerState, user_id: PlayerId, game_id: GameId) -> Result<ServerMessage> {
        let game = state.engine.game(game_id)?;
        if !game.is_participant(user_id) {
            return Err(StateError::NotParticipant.into());
        }
        Ok(ServerMessage::GameState(game))
    }

    fn error_message(error: &GameError) -> ServerMessage {
        ServerMessage::Error {
            code: error.code(),
            message: error.to_string(),
        }
    }
}

/// TCP 服务器
pub struct Server {
    listener: TcpListener,
    state: Arc<ServerState>,
    /// 连接数上限
    permits: Arc<Semaphore>,
}

impl Server {
    pub async fn bind(state: Arc<ServerState>) -> protocol::Result<Self> {
        let listener = TcpListener::bind(&state.config.bind_addr).await?;
        let permits = Arc::new(Semaphore::new(state.config.max_connections));
        Ok(Self {
            listener,
            state,
            permits,
        })
    }

    pub fn local_addr(&self) -> Option<String> {
        self.listener.local_addr()
    }

    /// 接受连接直到监听器出错
    pub async fn run(mut self) -> protocol::Result<()> {
        info!("Listening on {:?}", self.local_addr());

        loop {
            let Ok(permit) = self.permits.clone().acquire_owned().await else {
                return Ok(());
            };

            let conn = match self.listener.accept().await {
                Ok(conn) => conn,
                Err(ProtocolError::Io(e)) => return Err(ProtocolError::Io(e)),
                Err(e) => {
                    warn!("Failed to accept connection: {}", e);
                    continue;
                }
            };

            let state = self.state.clone();
            tokio::spawn(async move {
                let _permit = permit;
                Self::serve(conn, state).await;
            });
        }
    }

    /// 一个连接上逐个处理请求
    async fn serve(mut conn: TcpConnection, state: Arc<ServerState>) {
        let peer = conn.peer_addr().unwrap_or_default();
        debug!("Connection from {}", peer);

        loop {
            let request: Request = match conn.recv().await {
                Ok(request) => request,
                Err(ProtocolError::ConnectionClosed) => break,
                Err(e) => {
                    warn!("Dropping connection {}: {}", peer, e);
                    break;
                }
            };

            let response = tokio::task::block_in_place(|| MessageHandler::handle(&state, request));
            if let Err(e) = conn.send(&response).await {
                warn!("Failed to reply to {}: {}", peer, e);
                break;
            }
        }

        debug!("Connection {} closed", peer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::{Connector, ErrorCode, GameStatus, MatchStatus, Position, TcpConnector, BOT_PLAYER_ID};

    use crate::config::StorageBackend;
    use crate::storage::MemoryStore;

    fn state() -> ServerState {
        let config = ServerConfig {
            bind_addr: "127.0.0.1:0".to_string(),
            storage: StorageBackend::Memory,
            ..ServerConfig::default()
        };
        ServerState::new(config, Arc::new(MemoryStore::new()))
    }

    fn pos(row: u8, col: u8) -> Position {
        Position::new_unchecked(row, col)
    }

    fn matched_game(message: ServerMessage) -> GameId {
        match message {
            ServerMessage::Queue(MatchStatus::Matched { game_id, .. }) => game_id,
            other => panic!("expected a match, got {:?}", other),
        }
    }

    fn error_code(message: ServerMessage) -> ErrorCode {
        match message {
            ServerMessage::Error { code, .. } => code,
            other => panic!("expected an error, got {:?}", other),
        }
    }

    #[test]
    fn test_ping() {
        let state = state();
        assert!(matches!(
            MessageHandler::handle(&state, Request::new(1, ClientMessage::Ping)),
            ServerMessage::Pong
        ));
    }

    #[test]
    fn test_queue_flow() {
        let state = state();

        assert!(matches!(
            MessageHandler::handle(&state, Request::new(1, ClientMessage::JoinQueue)),
            ServerMessage::Queue(MatchStatus::Waiting { .. })
        ));
        assert_eq!(
            error_code(MessageHandler::handle(&state, Request::new(1, ClientMessage::JoinQueue))),
            ErrorCode::AlreadyQueued
        );

        let game_id = matched_game(MessageHandler::handle(&state, Request::new(2, ClientMessage::JoinQueue)));
        assert_eq!(
            matched_game(MessageHandler::handle(&state, Request::new(1, ClientMessage::CheckQueue))),
            game_id
        );

        assert!(matches!(
            MessageHandler::handle(&state, Request::new(3, ClientMessage::LeaveQueue)),
            ServerMessage::QueueLeft
        ));
    }

    #[test]
    fn test_move_errors_carry_codes() {
        let state = state();
        MessageHandler::handle(&state, Request::new(1, ClientMessage::JoinQueue));
        let game_id = matched_game(MessageHandler::handle(&state, Request::new(2, ClientMessage::JoinQueue)));

        // 2 是后手
        let not_turn = MessageHandler::handle(
            &state,
            Request::new(
                2,
                ClientMessage::MakeMove {
                    game_id,
                    from: pos(5, 0),
                    to: pos(4, 1),
                },
            ),
        );
        assert_eq!(error_code(not_turn), ErrorCode::NotYourTurn);

        let invalid = MessageHandler::handle(
            &state,
            Request::new(
                1,
                ClientMessage::MakeMove {
                    game_id,
                    from: pos(2, 1),
                    to: pos(2, 3),
                },
            ),
        );
        assert_eq!(error_code(invalid), ErrorCode::InvalidMove);

        let outsider = MessageHandler::handle(&state, Request::new(9, ClientMessage::GetGame { game_id }));
        assert_eq!(error_code(outsider), ErrorCode::NotParticipant);

        let missing = MessageHandler::handle(&state, Request::new(1, ClientMessage::GetGame { game_id: 999 }));
        assert_eq!(error_code(missing), ErrorCode::GameNotFound);

        let bot = MessageHandler::handle(&state, Request::new(BOT_PLAYER_ID, ClientMessage::JoinQueue));
        assert_eq!(error_code(bot), ErrorCode::InvalidPlayer);
    }

    #[test]
    fn test_play_bot_and_resign() {
        let state = state();
        MessageHandler::handle(&state, Request::new(1, ClientMessage::JoinQueue));

        let game = match MessageHandler::handle(&state, Request::new(1, ClientMessage::PlayBot)) {
            ServerMessage::GameState(game) => game,
            other => panic!("unexpected {:?}", other),
        };
        assert!(game.is_bot_game());
        assert_eq!(state.matchmaker.waiting().unwrap(), 0);

        let report = MessageHandler::handle(
            &state,
            Request::new(
                1,
                ClientMessage::MakeMove {
                    game_id: game.id,
                    from: pos(2, 1),
                    to: pos(3, 0),
                },
            ),
        );
        match report {
            ServerMessage::MoveApplied { game, moves } => {
                // 玩家一步 + 机器人应招
                assert!(moves.len() >= 2);
                assert_eq!(moves[1].user_id, BOT_PLAYER_ID);
                assert_eq!(game.current_player, protocol::Player::Player1);
            }
            other => panic!("unexpected {:?}", other),
        }

        match MessageHandler::handle(&state, Request::new(1, ClientMessage::Resign { game_id: game.id })) {
            ServerMessage::GameState(game) => {
                assert_eq!(game.status, GameStatus::Finished);
                assert_eq!(game.winner_id, Some(BOT_PLAYER_ID));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_tcp_round_trip() {
        let server = Server::bind(Arc::new(state())).await.unwrap();
        let addr = server.local_addr().unwrap();
        tokio::spawn(server.run());

        let mut alice = TcpConnector.connect(&addr).await.unwrap();
        let mut bob = TcpConnector.connect(&addr).await.unwrap();

        let pong = alice.request(&Request::new(1, ClientMessage::Ping)).await.unwrap();
        assert!(matches!(pong, ServerMessage::Pong));

        let waiting = alice.request(&Request::new(1, ClientMessage::JoinQueue)).await.unwrap();
        assert!(matches!(waiting, ServerMessage::Queue(MatchStatus::Waiting { .. })));
        let game_id = matched_game(bob.request(&Request::new(2, ClientMessage::JoinQueue)).await.unwrap());

        let moved = alice
            .request(&Request::new(
                1,
                ClientMessage::MakeMove {
                    game_id,
                    from: pos(2, 1),
                    to: pos(3, 2),
                },
            ))
            .await
            .unwrap();
        match moved {
            ServerMessage::MoveApplied { game, moves } => {
                assert_eq!(moves.len(), 1);
                assert_eq!(game.current_player, protocol::Player::Player2);
            }
            other => panic!("unexpected {:?}", other),
        }

        match bob.request(&Request::new(2, ClientMessage::GetGame { game_id })).await.unwrap() {
            ServerMessage::GameState(game) => assert!(game.board_state.piece_at(pos(3, 2)).is_some()),
            other => panic!("unexpected {:?}", other),
        }
    }
}
