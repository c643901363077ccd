pub mod guards;
pub mod rate_limit;
pub mod router;
pub mod routes;
pub mod session;
