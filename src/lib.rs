pub mod backend;
pub mod config;
pub mod error;
pub mod filter;
pub mod links;
pub mod model;
pub mod profile;
pub mod render;
pub mod surface;
pub mod view;
