//! camptrack Core Library
//!
//! This crate provides the core functionality for camptrack, a camp roster,
//! attendance and group tracker whose data lives in a shared document
//! database.
//!
//! # Architecture
//!
//! - **Document database**: collections of JSON documents with filtered
//!   queries, atomic batches and live listeners (`database`)
//! - **Mirror**: follows the database and rebuilds local state from each
//!   snapshot (`mirror`)
//! - **Store**: mutations and reads for one session (`store`)
//!
//! # Quick Start
//!
//! ```text
//! let mut store = CampStore::open(&config)?;
//!
//! let camp = store.add_camp("Summer Elite", None)?;
//! let athlete = store.add_athlete(NewAthlete::named("Jordan Lee"))?;
//! store.assign_group(athlete.id, date, group.id.into(), Confirmation::Unconfirmed)?;
//!
//! let board = store.group_board(date);
//! ```
//!
//! # Modules
//!
//! - `store`: Camp store (main entry point)
//! - `models`: Camps, athletes, groups, attendance, overrides, notes
//! - `database`: Document database trait and its Automerge implementation
//! - `mirror`: Local state kept in step with the database
//! - `access`: Which camps a session sees
//! - `resolve`: Date-scoped group and attendance resolution
//! - `views`: Group board, attendance summary and history
//! - `import`: Roster CSV import
//! - `photos`: Athlete photos kept on this device
//! - `session`: Signed-in user and selected camp
//! - `config`: Application configuration

pub mod access;
pub mod config;
pub mod database;
pub mod import;
pub mod mirror;
pub mod models;
pub mod photos;
pub mod resolve;
pub mod session;
pub mod store;
pub mod views;

pub use config::Config;
pub use database::{DatabaseError, DocumentStore, LocalDatabase};
pub use import::{ImportError, ImportReport};
pub use models::{
    Athlete, AthleteUpdate, AttendanceStatus, Camp, CampUpdate, Group, GroupRef, GroupUpdate,
    NewAthlete, Note, NoteKind, UserProfile,
};
pub use photos::{PhotoError, PhotoStore};
pub use session::{CampSelection, Role, Session};
pub use store::{ActionError, CampStore, Confirmation};
