//! Persistence boundary.
//!
//! Two tiers: the synchronous [`local::LocalCache`] that is always present, and
//! an optional [`remote::RemoteStore`] used only while a user is signed in.

pub mod local;
pub mod remote;

pub use local::{CacheKey, LocalCache};
pub use remote::{RemoteStore, SqliteRemoteStore, UserData};
