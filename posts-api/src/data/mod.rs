pub(crate) mod error;
pub(crate) mod post_store;
pub(crate) mod repositories;
pub(crate) mod user_store;
