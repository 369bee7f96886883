pub mod twab_rewards;

pub use twab_rewards::TwabRewardsReader;
