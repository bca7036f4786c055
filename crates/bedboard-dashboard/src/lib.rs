//! Realtime ER bed-availability dashboard.
//!
//! Subscribes to a realtime hospital store, mirrors the tree into a
//! single-writer view state, and lets an operator admit/discharge patients
//! through optimistic bed-count transactions.

pub mod app;
pub mod config;
pub mod mirror;
pub mod notice;
pub mod observability;
pub mod subscriber;
pub mod transactor;
pub mod view;

pub use app::{Dashboard, DashboardBuilder};
pub use config::{ConfigError, DashboardConfig, load_config};
pub use mirror::{HospitalMirror, ViewState};
pub use notice::{Notice, NoticeBoard};
pub use subscriber::SnapshotSubscriber;
pub use transactor::update_bed_status;
pub use view::{display_hospital_detail, render};
