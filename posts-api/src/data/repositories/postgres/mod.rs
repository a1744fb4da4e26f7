pub(crate) mod post_store;
pub(crate) mod user_store;
