pub mod agency;
pub mod auth;
pub mod cancellation;
pub mod health;
pub mod notification;
pub mod rota;
pub mod shift;
pub mod swap;
pub mod user;
