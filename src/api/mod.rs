//! API handlers for Libellus REST endpoints

pub mod books;
pub mod health;
pub mod loans;
pub mod openapi;
