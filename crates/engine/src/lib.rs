//! # Votematch Engine
//!
//! Adaptive questionnaire that places a user in each cluster's latent policy
//! space and ranks legislators by cosine similarity.
//!
//! ```text
//! MatchingState ──select_next_question──> Question
//!      ▲                                     │ answer
//!      └────────────── update <──────────────┘
//!      │
//!      ├──> rank (per cluster)
//!      └──> aggregate (importance-weighted, across clusters)
//! ```
//!
//! The algorithmic core is pure; [`MatchService`] adds sessions on top of it
//! through a pluggable [`SessionStore`].

mod aggregate;
mod config;
mod error;
mod matcher;
mod ranker;
mod selector;
mod service;
mod session;
mod state;
mod store;
mod updater;

pub use aggregate::{aggregate, validate_importance, MAX_IMPORTANCE, MIN_IMPORTANCE};
pub use config::EngineConfig;
pub use error::{EngineError, Result};
pub use matcher::Matcher;
pub use ranker::{member_similarity, rank};
pub use selector::{bill_title, select_next_question};
pub use service::MatchService;
pub use session::{ClusterProgress, Session, SessionId};
pub use state::MatchingState;
pub use store::{InMemorySessionStore, SessionStore};
pub use updater::{clip_score, update};
