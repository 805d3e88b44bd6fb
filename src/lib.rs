//! `revealgate` - timed disclosure and engagement simulation engine
//!
//! A reveal state machine (Idle → Playing → Revealed) that gates a
//! call-to-action behind a simulated watch delay, plus the timers it drives:
//! urgency counters, a social proof notifier, and an exit-intent guard. The
//! seen flag is the only state that outlives a session.
//!
//! ```no_run
//! use revealgate::config::FunnelConfig;
//! use revealgate::funnel::{Collaborators, Session};
//!
//! # async fn demo() {
//! let session = Session::start(FunnelConfig::default(), Collaborators::offline());
//! session.play();
//! let (_surface, mut changes) = session.watch_changes();
//! if let Ok(change) = changes.recv().await {
//!     println!("{}", change.kind());
//! }
//! session.shutdown().await;
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod funnel;
pub mod geo;
pub mod navigation;
pub mod observability;
pub mod storage;
