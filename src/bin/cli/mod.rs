//! CLI module for the deploytrack tool
//!
//! This module organizes all CLI-related functionality including
//! command handlers and terminal rendering.

pub mod commands;
pub mod render;

pub use commands::{
    handle_config_command, handle_dismiss_command, handle_history_command, handle_logs_command,
    handle_prune_command, handle_replay_command, handle_show_command, handle_status_command,
    handle_track_command, handle_trigger_command, handle_watch_command, handle_workflows_command,
};
