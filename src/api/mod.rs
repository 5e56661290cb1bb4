pub mod page;
pub mod rest;
pub mod ws;

pub use rest::router;
