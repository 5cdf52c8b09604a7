//! # medreg Core
//!
//! Change tracking and save reconciliation for the registration grids.
//!
//! This crate contains pure data operations:
//! - [`ChangeTracker`]: which row positions are pending insert, update or delete
//! - [`KeyedChangeTracker`]: the same bookkeeping keyed by a stable [`RowKey`]
//! - [`GridSession`]: the load, edit, save and delete workflow of one registration screen
//!
//! **No transport concerns**: HTTP requests to the servlet backend belong in `medreg-client`,
//! which implements the [`Persistence`] and [`RowSource`] traits defined here.

pub mod change;
pub mod change_set;
pub mod config;
pub mod constants;
pub mod error;
pub mod keyed;
pub mod notify;
pub mod persistence;
pub mod session;
pub mod tracker;
pub mod validation;

pub use change::ChangeKind;
pub use change_set::ChangeSet;
pub use config::SessionConfig;
pub use error::{PersistError, PersistResult, SaveError, SaveResult, TrackerError, TrackerResult};
pub use keyed::{KeyedChangeTracker, RowKey};
pub use notify::{LogNotifier, Notice, Notifier};
pub use persistence::{Persistence, RowSource, SaveBatch, SaveOutcome, SearchQuery};
pub use session::{DeleteReport, GridSession, SaveReport};
pub use tracker::ChangeTracker;
pub use validation::{FieldAccess, RequiredFields};

pub use medreg_types::{NonEmptyText, Row, TextError};
