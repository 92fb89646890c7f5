//! Core timeline engine: day layout, lane packing and activity grouping.
//! This crate is the single source of truth for grouping invariants.

pub mod config;
pub mod db;
pub mod layout;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::TimelineConfig;
pub use layout::item::{Span, TimelineItem, TimelineItemKey};
pub use layout::lanes::LaneAssignment;
pub use layout::visibility::LayoutFilters;
pub use layout::{compute_layout, DayLayout, DaySummary, PlacedItem};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::activity::{ActivityId, ActivityRecord, ClientId, GroupId};
pub use model::day::TimelineDay;
pub use model::group::{ActivityGroup, ResolvedGroup};
pub use model::validation::ValidationError;
pub use model::RecordRef;
pub use repo::timeline_repo::{SqliteTimelineStore, StoreError, StoreResult, TimelineStore};
pub use service::client_directory::{ClientDirectory, ClientLookupError, StaticClientDirectory};
pub use service::controller::{
    DaySnapshot, LoadOutcome, LoadTicket, PendingOp, TimelineController, TimelineState,
};
pub use service::error::{TimelineError, TimelineResult};
pub use service::grouping_service::GroupingEngine;
pub use service::selection::SelectionModel;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
