//! Core components, types, and utilities for the sippy agent.
//!
//! This module contains fundamental building blocks used throughout the application:
//! - Configuration handling and environment variables.
//! - Prompt templates for the ReAct loop.
//! - Typed core errors.
//! - Common types and result handling.

pub mod config;
pub mod error;
pub mod prompts;
pub mod types;
