//! Two-player chess sessions driven by a pure transition function.
//!
//! [`game::Reducer`] turns a [`models::SessionState`] plus one
//! [`models::GameAction`] into a new state and the follow-up actions the caller
//! must apply next. Chess rules sit behind [`game::RulesEngine`]; the
//! `websocket` and `routes` modules host sessions for connected players.

pub mod config;
pub mod error;
pub mod game;
pub mod models;
pub mod routes;
pub mod websocket;

pub use config::Config;
pub use error::{RulesError, SessionError};
pub use game::{Reducer, RulesEngine, StandardRules};
pub use models::{GameAction, SessionState};
