pub(crate) mod auth_service;
pub(crate) mod paginator;
pub(crate) mod post_service;
