pub mod key;
pub mod routes;
