//! Timed disclosure engine
//!
//! The reveal state machine and the timer subsystems it arms. The engine
//! decides what the visitor sees and when; rendering is left to whoever
//! subscribes to the [`Surface`].
//!
//! # Architecture
//!
//! - [`RevealState`] / [`RevealCell`]: forward-only funnel stage (Idle → Playing → Revealed)
//! - [`Session`]: orchestrator owning the surface, timers, and teardown
//! - [`Change`]: one visible surface transition, published where it happens
//! - [`urgency`]: viewer walk and scarcity countdown, always running
//! - [`social_proof`]: name rotation, armed on reveal
//! - [`exit_guard`]: pointer-leave and back-navigation interception, armed on reveal

pub mod change;
pub mod exit_guard;
pub mod session;
pub mod social_proof;
pub mod state;
pub mod urgency;

pub use change::Change;
pub use exit_guard::PageSignal;
pub use session::{Collaborators, RevealSource, Session};
pub use social_proof::NameRotation;
pub use state::{Notification, RevealCell, RevealState, Surface};
