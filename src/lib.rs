// Copyright 2026 Regcheck Contributors
// SPDX-License-Identifier: Apache-2.0

//! Vehicle registration lookup core.
//!
//! Given a UK registration identifier, regcheck fetches the matching report
//! page from the upstream host, extracts whatever vehicle data the page
//! offers and keeps the result in a local SQLite store. Stored records are
//! served for repeat lookups inside a freshness window, so hot
//! registrations never touch the network twice in a row.
//!
//! ## Modules
//!
//! - [`record`]: the vehicle report document model
//! - [`extract`]: table-driven field extraction from report markup
//! - [`fetch`]: the HTTP client facing the report host
//! - [`store`]: SQLite persistence with full-replace upserts
//! - [`lookup`]: the orchestrator tying the stages together
//! - [`config`]: defaults and environment overrides

pub mod config;
pub mod extract;
pub mod fetch;
pub mod lookup;
pub mod record;
pub mod store;
