//! # Repo Mirror
//!
//! Mirrors the tree of a remote Git repository into a relational store so
//! its markdown can be browsed without the remote.
//!
//! A full update lists the remote tree, wipes the stored tree, persists one
//! node per distinct path, stores the content of every markdown file, and
//! gives every directory a document: its `README.md` (or `index.md`) when it
//! has one, a generated table of contents otherwise.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────────────────┐   ┌──────────┐
//! │   Remote    │──▶│  decompose → materialize  │──▶│  SQLite  │
//! │ list / blob │   │  fetch → resolve / toc    │   │  Store   │
//! └─────────────┘   └──────────────────────────┘   └────┬─────┘
//!                                                       │
//!                      ┌────────────────────────────────┤
//!                      ▼                                ▼
//!                 ┌──────────┐                    ┌──────────┐
//!                 │   CLI    │                    │   HTTP   │
//!                 │ (mirror) │                    │ trigger  │
//!                 └──────────┘                    └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Listing entries, tree nodes, content records |
//! | [`error`] | Pipeline error kinds and failure stages |
//! | [`remote`] | Remote repository source (GitHub) |
//! | [`fetcher`] | Blob fetch and decode |
//! | [`decompose`] | Path splitting and run-scoped dedup |
//! | [`materialize`] | Node persistence |
//! | [`resolver`] | Directory content resolution |
//! | [`toc`] | Table-of-contents rendering |
//! | [`ingest`] | Full-update orchestration |
//! | [`store`] | Storage trait and in-memory backend |
//! | [`sqlite_store`] | SQLite backend |
//! | [`server`] | HTTP trigger and read API |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod auth;
pub mod browse;
pub mod config;
pub mod db;
pub mod decompose;
pub mod error;
pub mod fetcher;
pub mod ingest;
pub mod logging;
pub mod materialize;
pub mod migrate;
pub mod models;
pub mod progress;
pub mod remote;
pub mod resolver;
pub mod server;
pub mod sqlite_store;
pub mod store;
pub mod toc;
