//! # DEX State SDK
//!
//! A client-side state-synchronization and caching library for DeFi market
//! frontends. The crate provides the plumbing between an external chain SDK
//! / pricing REST API and an application's reactive state: a slice-
//! partitioned store of normalized on-chain reads, stable query keys,
//! staleness windows, request coalescing and explicit per-field fetch state.
//!
//! ## Architecture
//!
//! ### Identity Layer
//! Stable cache identities: composite active keys (`chain-address-entity`)
//! and query key tuples derived from typed request parameters.
//!
//! ### Store Layer
//! A dependency-injected `AppStore` of named slices, each with a uniform
//! setter surface (`set_state_by_key`, `set_state_by_active_key`,
//! `set_state_by_keys`, `reset_state`) and capacity-bounded keyed maps.
//!
//! ### Query Layer
//! `QueryCache` entries carry `Idle / Loading / Ready / Failed` state,
//! serve fresh reads without refetching, coalesce concurrent identical
//! requests into one in-flight call and discard late writes after a scope
//! reset (wallet disconnect, network switch).
//!
//! ### Boundary Layer
//! The `ChainSdk` trait and the pricing API client; validation suites gate
//! whether a query may execute at all.

// Identity Layer
/// Composite per-request cache keys
pub mod active_key;
/// Stable query key tuples and the params trait
pub mod query_key;
/// Precondition checks gating query execution
pub mod validation;

// Store Layer
/// Slice-partitioned application store and setter helpers
pub mod store;
/// Concrete slices and their fetch actions
pub mod slices;

// Query Layer
/// Keyed query cache with staleness, coalescing and scopes
pub mod query_cache;

// Boundary Layer
/// External chain SDK trait
pub mod sdk;
/// Pricing/analytics REST API client
pub mod prices_api;

// Infrastructure
/// Persisted user preferences (locale, theme)
pub mod app_cache;
/// Top-level client wiring
pub mod client;
/// Fetch error taxonomy
pub mod errors;
/// Metrics and observability
pub mod metrics;
/// Configuration management
pub mod settings;
/// Shared value types
pub mod types;

// Re-exports for convenience
pub use active_key::ActiveKey;
pub use client::AppClient;
pub use errors::FetchError;
pub use query_cache::{QueryCache, QueryCacheConfig, QueryState};
pub use query_key::{KeyPart, QueryKey, QueryParams};
pub use sdk::{ChainSdk, SdkError};
pub use settings::Settings;
pub use store::{ActiveKeyMap, AppStore, Slice, SliceState};
pub use types::{ChainId, MarketSnapshot, Quote, VoteEscrowInfo};
