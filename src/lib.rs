//! scoutfeed - live paginated list synchronization for block explorer listings
//!
//! Keeps one listing page (blocks, transactions, address activity) in sync with
//! both paginated HTTP fetches and a live Phoenix channel, and projects the
//! resulting list onto a render tree with minimal mutations.
//!
//! ## Architecture
//!
//! - **Store**: `store` + `reducer` hold the list state and serialize every change
//! - **Intake**: `channel` (Phoenix socket) and `batch` (debounced batches)
//! - **Merge**: `filter` and `reconcile` decide what enters the visible window
//! - **Pages**: `loader`, `fetch` and `pagination` drive cursor and indexed paging
//! - **Render**: `differ`, `render` and `regions` project state onto a tree
//! - **Controller**: `view` owns one listing end to end
//!
//! ## Usage
//!
//! ```bash
//! scoutfeed --base-url https://explorer.example --feed transactions
//! ```

// Core modules (available on all platforms)
pub mod action;
pub mod config;
pub mod error;
pub mod filter;
pub mod reconcile;
pub mod reducer;
pub mod state;
pub mod store;
pub mod types;

// Intake and transport
pub mod batch;
pub mod channel;
pub mod decode;
pub mod feeds;

// Paging (HTTP source is native-only)
#[cfg(feature = "native")]
pub mod fetch;
pub mod loader;
#[cfg(feature = "native")]
pub mod net;
pub mod pagination;

// Rendering
pub mod differ;
pub mod regions;
pub mod render;

pub mod view;
