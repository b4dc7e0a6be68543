pub mod agency;
pub mod cancellation;
pub mod notification;
pub mod rota;
pub mod shift;
pub mod swap;
pub mod user;
