// src/slices/mod.rs
// Concrete store slices and the fetch actions that feed them. Each slice's
// mutation surface lives in this module tree; the rest of the crate reads
// through `AppStore`.

pub mod store_cache;
pub mod user;
pub mod user_balances;

pub use store_cache::{MarketSnapshotParams, StoreCacheActions, StoreCacheState};
pub use user::{UserActions, UserState, VoteEscrowParams};
pub use user_balances::{UserBalancesActions, UserBalancesParams, UserBalancesState};
