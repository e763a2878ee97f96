pub mod q_table;

pub use q_table::{QTableAgent, QTableAgentConfig, Rollout, ValueTable};
