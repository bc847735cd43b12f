pub mod auth;
pub mod categories;
pub mod extract;
pub mod products;
pub mod sales;
