pub mod admins;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;
pub mod routes;
