//! Command handlers for the deploytrack CLI

pub mod config;
pub mod history;
pub mod logs;
pub mod status;
pub mod track;
pub mod trigger;

pub use config::handle_config_command;
pub use history::{handle_history_command, handle_replay_command, handle_workflows_command};
pub use logs::handle_logs_command;
pub use status::{
    handle_prune_command, handle_show_command, handle_status_command, handle_watch_command,
};
pub use track::{handle_dismiss_command, handle_track_command};
pub use trigger::handle_trigger_command;
