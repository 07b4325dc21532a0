//! 匹配队列
//!
//! 队列由一把锁保护：查找对手、创建对局、移除双方在同一个临界区内完成，
//! 同一个等待者不会被两次配对。对局创建成功后才移除队列项。

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use protocol::{GameRecord, MatchStatus, PlayerId, QueueRecord, StateError, BOT_PLAYER_ID, MATCHMAKING_TIMEOUT};

use crate::engine::TurnEngine;
use crate::error::Result;

/// 时间来源
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// 系统时钟
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 匹配器
pub struct Matchmaker {
    engine: Arc<TurnEngine>,
    clock: Arc<dyn Clock>,
    /// 等待超时后改为与机器人对局
    timeout: Duration,
    /// 按加入顺序排列的等待队列
    queue: Mutex<Vec<QueueRecord>>,
}

impl Matchmaker {
    pub fn new(engine: Arc<TurnEngine>) -> Self {
        Self {
            engine,
            clock: Arc::new(SystemClock),
            timeout: MATCHMAKING_TIMEOUT,
            queue: Mutex::new(Vec::new()),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// 加入队列并立即尝试配对
    pub fn join(&self, user_id: PlayerId) -> Result<MatchStatus> {
        if user_id == BOT_PLAYER_ID {
            return Err(StateError::ReservedPlayer(user_id).into());
        }

        let mut queue = self.queue.lock()?;
        if queue.iter().any(|entry| entry.user_id == user_id) {
            return Err(StateError::AlreadyQueued.into());
        }

        // 先配对再入队：创建对局失败时队列保持原样
        if let Some(game) = self.pair(&mut queue, user_id)? {
            return Ok(MatchStatus::Matched {
                game_id: game.id,
                against_bot: false,
            });
        }

        queue.push(QueueRecord {
            user_id,
            joined_at: self.clock.now(),
        });
        debug!("Player {} joined the queue ({} waiting)", user_id, queue.len());
        Ok(MatchStatus::Waiting { waited_secs: 0 })
    }

    /// 轮询匹配状态
    ///
    /// 已不在队列中：报告最近的进行中对局。仍在队列中：再次尝试配对，
    /// 等待超过超时时间则改为与机器人对局。
    pub fn check(&self, user_id: PlayerId) -> Result<MatchStatus> {
        let mut queue = self.queue.lock()?;

        let Some(entry) = queue.iter().find(|entry| entry.user_id == user_id).copied() else {
            return Ok(match self.engine.latest_in_progress(user_id)? {
                Some(game) => MatchStatus::Matched {
                    game_id: game.id,
                    against_bot: game.is_bot_game(),
                },
                None => MatchStatus::NotQueued,
            });
        };

        if let Some(game) = self.pair(&mut queue, user_id)? {
            return Ok(MatchStatus::Matched {
                game_id: game.id,
                against_bot: false,
            });
        }

        let waited = (self.clock.now() - entry.joined_at).to_std().unwrap_or_default();
        if waited >= self.timeout {
            let game = self.engine.create_bot_game(user_id)?;
            queue.retain(|e| e.user_id != user_id);
            info!("Player {} waited {:?}, paired with bot in game {}", user_id, waited, game.id);
            return Ok(MatchStatus::Matched {
                game_id: game.id,
                against_bot: true,
            });
        }

        Ok(MatchStatus::Waiting {
            waited_secs: waited.as_secs(),
        })
    }

    /// 离开队列（不在队列中也不报错），返回是否确实移除了
    pub fn leave(&self, user_id: PlayerId) -> Result<bool> {
        let mut queue = self.queue.lock()?;
        let before = queue.len();
        queue.retain(|entry| entry.user_id != user_id);
        Ok(queue.len() != before)
    }

    /// 队列中等待最久的其他玩家
    pub fn find_opponent(&self, user_id: PlayerId) -> Result<Option<PlayerId>> {
        let queue = self.queue.lock()?;
        Ok(Self::oldest_other(&queue, user_id).map(|entry| entry.user_id))
    }

    /// 当前等待人数
    pub fn waiting(&self) -> Result<usize> {
        Ok(self.queue.lock()?.len())
    }

    fn oldest_other(queue: &[QueueRecord], user_id: PlayerId) -> Option<QueueRecord> {
        // 同一时刻加入的按队列顺序
        queue
            .iter()
            .filter(|entry| entry.user_id != user_id)
            .min_by_key(|entry| entry.joined_at)
            .copied()
    }

    /// 在持有队列锁时配对：等待最久的一方执先手
    fn pair(&self, queue: &mut Vec<QueueRecord>, user_id: PlayerId) -> Result<Option<GameRecord>> {
        let Some(opponent) = Self::oldest_other(queue, user_id) else {
            return Ok(None);
        };

        let game = self.engine.create_game(opponent.user_id, user_id)?;
        queue.retain(|entry| entry.user_id != user_id && entry.user_id != opponent.user_id);
        info!(
            "Matched {} with {} in game {}",
            opponent.user_id, user_id, game.id
        );
        Ok(Some(game))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::thread;

    use draughts_ai::RandomBot;
    use protocol::GameId;

    use crate::error::{GameError, StorageError};
    use crate::game::Game;
    use crate::storage::{GameStore, MemoryStore};

    /// 保存总是失败的存储
    struct BrokenStore;

    impl GameStore for BrokenStore {
        fn next_id(&self) -> std::result::Result<GameId, StorageError> {
            Ok(1)
        }

        fn save(&self, _game: &Game) -> std::result::Result<(), StorageError> {
            Err(StorageError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk full")))
        }

        fn load(&self, _id: GameId) -> std::result::Result<Option<Game>, StorageError> {
            Ok(None)
        }

        fn latest_in_progress(&self, _user_id: PlayerId) -> std::result::Result<Option<GameRecord>, StorageError> {
            Ok(None)
        }
    }

    /// 手动推进的时钟
    struct ManualClock(Mutex<DateTime<Utc>>);

    impl ManualClock {
        fn new() -> Self {
            Self(Mutex::new(Utc::now()))
        }

        fn advance(&self, secs: i64) {
            *self.0.lock().unwrap() += chrono::Duration::seconds(secs);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    fn matchmaker() -> (Matchmaker, Arc<MemoryStore>, Arc<ManualClock>) {
        let store = Arc::new(MemoryStore::new());
        let engine = Arc::new(TurnEngine::new(store.clone(), Box::new(RandomBot::with_seed(3))));
        let clock = Arc::new(ManualClock::new());
        let matchmaker = Matchmaker::new(engine).with_clock(clock.clone());
        (matchmaker, store, clock)
    }

    fn matched_game(status: MatchStatus) -> GameId {
        match status {
            MatchStatus::Matched { game_id, .. } => game_id,
            other => panic!("expected a match, got {:?}", other),
        }
    }

    #[test]
    fn test_join_waits_then_pairs() {
        let (matchmaker, store, clock) = matchmaker();

        assert_eq!(matchmaker.join(1).unwrap(), MatchStatus::Waiting { waited_secs: 0 });
        clock.advance(3);
        assert_eq!(matchmaker.check(1).unwrap(), MatchStatus::Waiting { waited_secs: 3 });

        let game_id = matched_game(matchmaker.join(2).unwrap());
        assert_eq!(matchmaker.waiting().unwrap(), 0);

        // 等待较久的一方执先手
        let game = store.load(game_id).unwrap().unwrap();
        assert_eq!(game.record.player1_id, 1);
        assert_eq!(game.record.player2_id, 2);

        // 已配对的玩家轮询时得到同一局
        assert_eq!(
            matchmaker.check(1).unwrap(),
            MatchStatus::Matched {
                game_id,
                against_bot: false
            }
        );
    }

    #[test]
    fn test_fifo_order() {
        let (matchmaker, store, clock) = matchmaker();

        matchmaker.join(1).unwrap();
        clock.advance(1);
        matchmaker.leave(1).unwrap();
        matchmaker.join(2).unwrap();
        clock.advance(1);
        // 1 已离开，2 在等待
        assert_eq!(matchmaker.find_opponent(3).unwrap(), Some(2));

        let game_id = matched_game(matchmaker.join(3).unwrap());
        assert_eq!(store.load(game_id).unwrap().unwrap().record.player1_id, 2);
    }

    #[test]
    fn test_oldest_waiter_is_chosen() {
        let (matchmaker, _store, clock) = matchmaker();

        // 两个玩家先后加入会立即配对，所以直接构造等待队列
        {
            let mut queue = matchmaker.queue.lock().unwrap();
            let now = clock.now();
            queue.push(QueueRecord {
                user_id: 5,
                joined_at: now,
            });
            queue.push(QueueRecord {
                user_id: 4,
                joined_at: now - chrono::Duration::seconds(2),
            });
        }

        assert_eq!(matchmaker.find_opponent(9).unwrap(), Some(4));
        assert_eq!(matchmaker.find_opponent(4).unwrap(), Some(5));
    }

    #[test]
    fn test_already_queued() {
        let (matchmaker, _store, _clock) = matchmaker();

        matchmaker.join(1).unwrap();
        assert!(matches!(
            matchmaker.join(1),
            Err(GameError::State(StateError::AlreadyQueued))
        ));
        assert!(matches!(
            matchmaker.join(BOT_PLAYER_ID),
            Err(GameError::State(StateError::ReservedPlayer(0)))
        ));
    }

    #[test]
    fn test_failed_pairing_keeps_queue() {
        let engine = Arc::new(TurnEngine::new(Arc::new(BrokenStore), Box::new(RandomBot::with_seed(3))));
        let clock = Arc::new(ManualClock::new());
        let matchmaker = Matchmaker::new(engine).with_clock(clock.clone());

        assert_eq!(matchmaker.join(1).unwrap(), MatchStatus::Waiting { waited_secs: 0 });

        // 创建对局失败：2 没有入队，1 仍在等待
        assert!(matches!(matchmaker.join(2), Err(GameError::Persistence(StorageError::Io(_)))));
        assert_eq!(matchmaker.waiting().unwrap(), 1);
        assert_eq!(matchmaker.find_opponent(2).unwrap(), Some(1));

        // 重试得到同样的存储错误，而不是 AlreadyQueued
        assert!(matches!(matchmaker.join(2), Err(GameError::Persistence(_))));
        assert!(!matchmaker.leave(2).unwrap());

        // 超时后改为机器人对局同样失败，1 留在队列中
        clock.advance(20);
        assert!(matches!(matchmaker.check(1), Err(GameError::Persistence(_))));
        assert_eq!(matchmaker.waiting().unwrap(), 1);
    }

    #[test]
    fn test_leave_is_idempotent() {
        let (matchmaker, store, _clock) = matchmaker();

        matchmaker.join(1).unwrap();
        assert!(matchmaker.leave(1).unwrap());
        assert!(!matchmaker.leave(1).unwrap());
        assert_eq!(matchmaker.check(1).unwrap(), MatchStatus::NotQueued);
        assert!(store.is_empty());
    }

    #[test]
    fn test_timeout_falls_back_to_bot() {
        let (matchmaker, store, clock) = matchmaker();

        matchmaker.join(1).unwrap();
        clock.advance(14);
        assert_eq!(matchmaker.check(1).unwrap(), MatchStatus::Waiting { waited_secs: 14 });
        assert!(store.is_empty());

        clock.advance(1);
        let status = matchmaker.check(1).unwrap();
        let game_id = matched_game(status);
        assert_eq!(
            status,
            MatchStatus::Matched {
                game_id,
                against_bot: true
            }
        );
        assert_eq!(matchmaker.waiting().unwrap(), 0);
        assert_eq!(store.len(), 1);

        let game = store.load(game_id).unwrap().unwrap();
        assert_eq!(game.record.player1_id, 1);
        assert_eq!(game.record.player2_id, BOT_PLAYER_ID);

        // 之后的轮询报告同一局，不会再创建对局
        clock.advance(30);
        assert_eq!(matchmaker.check(1).unwrap(), status);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_configurable_timeout() {
        let (matchmaker, _store, clock) = matchmaker();
        let matchmaker = matchmaker.with_timeout(Duration::from_secs(2));

        matchmaker.join(1).unwrap();
        clock.advance(2);
        assert!(matches!(
            matchmaker.check(1).unwrap(),
            MatchStatus::Matched { against_bot: true, .. }
        ));
    }

    #[test]
    fn test_concurrent_join_creates_one_game() {
        for _ in 0..20 {
            let (matchmaker, store, _clock) = matchmaker();
            let matchmaker = Arc::new(matchmaker);
            let barrier = Arc::new(Barrier::new(2));

            let handles: Vec<_> = [1, 2]
                .into_iter()
                .map(|user_id| {
                    let matchmaker = matchmaker.clone();
                    let barrier = barrier.clone();
                    thread::spawn(move || {
                        barrier.wait();
                        matchmaker.join(user_id).unwrap()
                    })
                })
                .collect();
            let statuses: Vec<MatchStatus> = handles.into_iter().map(|h| h.join().unwrap()).collect();

            assert_eq!(store.len(), 1);
            assert_eq!(matchmaker.waiting().unwrap(), 0);
            let matched = statuses
                .iter()
                .filter(|s| matches!(s, MatchStatus::Matched { .. }))
                .count();
            assert_eq!(matched, 1);

            // 两个玩家都能通过轮询找到同一局
            let a = matched_game(matchmaker.check(1).unwrap());
            let b = matched_game(matchmaker.check(2).unwrap());
            assert_eq!(a, b);
            let game = store.load(a).unwrap().unwrap();
            assert!(game.record.is_participant(1) && game.record.is_participant(2));
        }
    }

    #[test]
    fn test_concurrent_checks_claim_waiter_once() {
        let (matchmaker, store, _clock) = matchmaker();
        let matchmaker = Arc::new(matchmaker);

        // 三个玩家同时抢一个等待者
        matchmaker.join(1).unwrap();
        let barrier = Arc::new(Barrier::new(3));
        let handles: Vec<_> = [2, 3, 4]
            .into_iter()
            .map(|user_id| {
                let matchmaker = matchmaker.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    matchmaker.join(user_id).unwrap()
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // 4 个人只能组成 2 局，没有人同时在两局里
        assert_eq!(store.len(), 2);
        assert_eq!(matchmaker.waiting().unwrap(), 0);
        let mut seen = Vec::new();
        for user_id in 1..=4 {
            let game_id = matched_game(matchmaker.check(user_id).unwrap());
            seen.push(game_id);
        }
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 2);
    }
}
