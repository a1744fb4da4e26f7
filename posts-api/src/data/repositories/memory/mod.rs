//! Process-local stores with the same contracts as the PostgreSQL ones.
//! Used for `STORAGE_BACKEND=memory` and throughout the test suite.

pub(crate) mod post_store;
pub(crate) mod user_store;
