//! 跳棋机器人
//!
//! 包含:
//! - 局面评估函数
//! - 可替换的走法选择策略（随机 / 贪心），吃子优先

mod evaluate;
mod search;

pub use evaluate::Evaluator;
pub use search::{from_difficulty, BotStrategy, Candidates, GreedyBot, RandomBot};
