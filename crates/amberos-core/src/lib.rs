//! Orchestration layer between `amberos-api` and a home-automation hub.
//!
//! One [`Entry`] per configured device owns:
//!
//! - **[`DeviceSession`]**: the authenticated client, the per-group
//!   [`Handles`], and the gate that decides which capability groups are
//!   polled. Auth failures after setup become a [`ReloadRequest`] instead
//!   of an error.
//!
//! - **[`SubscriptionTable`]**: which entities want which groups. A
//!   group with no subscriber is released on the next poll pass.
//!
//! - **Two poll loops**: a slow [`PollCoordinator`] for every active
//!   group and a fast [`CastCoordinator`] for cast, whose lock also
//!   serializes cast commands.
//!
//! The [`Hub`] holds every entry and routes [`ServiceCall`]s; the
//! [`entity`] module maps handles onto sensors, binary sensors, a media
//! player, and a source select.

pub mod config;
pub mod coordinator;
pub mod entity;
pub mod entry;
pub mod error;
pub mod gate;
pub mod service;
pub mod session;
pub mod subscription;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::EntryConfig;
pub use coordinator::{CastCoordinator, PollCoordinator, PollStatus};
pub use entry::{Entry, EntryRuntime, EntryState};
pub use error::CoreError;
pub use gate::{ActiveSet, Transition, evaluate};
pub use service::{Hub, ServiceCall};
pub use session::{DeviceSession, Handles, ReloadRequest, SessionState};
pub use subscription::{Subscription, SubscriptionTable};
