//! jira-git-helper - keep a JIRA ticket, git branch and linked pull requests in sync
//!
//! This library crate exposes internal modules for integration testing.

pub mod commands;
pub mod config;
pub mod data;
pub mod filters;
pub mod fmt;
pub mod git;
pub mod integrations;
pub mod ticket;
pub mod tui;
pub mod util;
