//! # Documint
//!
//! Cross-space content search and credential management for
//! Contentful-backed dashboards.
//!
//! Documint lets a user connect any number of Contentful spaces and search
//! entries across all of them at once. Each space is queried through the
//! management API, raw locale-keyed entries are normalized into a uniform
//! record, and per-space result pages are merged with recomputed totals.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌─────────────┐   ┌────────────┐
//! │ Credential │──▶│  Aggregator  │──▶│ Normalizer │
//! │ store      │   │  (fan-out)  │   │ (flatten)  │
//! └────────────┘   └──────┬──────┘   └────────────┘
//!                         │ one query per space
//!                         ▼
//!                  ┌─────────────┐
//!                  │ Content API │  retry/backoff on rate limits
//!                  │  (reqwest)  │
//!                  └──────┬──────┘
//!        ┌────────────────┤
//!        ▼                ▼
//!   ┌──────────┐    ┌──────────┐
//!   │   CLI    │    │   HTTP   │
//!   │  (dmt)   │    │  (axum)  │
//!   └──────────┘    └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! dmt init                                      # create database
//! dmt connect --user u1 --space-id abc --token CFPAT-...
//! dmt search "launch post" --user u1            # search all spaces
//! dmt search "launch post" --user u1 --space abc
//! dmt serve                                     # start dashboard API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`client`] | Remote content API client with retry/backoff |
//! | [`normalize`] | Raw entry → flat record normalization |
//! | [`search`] | Cross-space fan-out and merge |
//! | [`session`] | Debounced, stale-safe search sessions |
//! | [`pagination`] | Ellipsis-compressed page windows |
//! | [`credentials`] | Per-user connected-space repository |
//! | [`server`] | Dashboard HTTP API |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod client;
pub mod config;
pub mod credentials;
pub mod db;
pub mod debounce;
pub mod error;
pub mod migrate;
pub mod models;
pub mod normalize;
pub mod pagination;
pub mod search;
pub mod server;
pub mod session;
pub mod spaces;
