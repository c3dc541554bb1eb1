pub mod client;
pub mod endpoints;
pub mod genres;
pub mod images;
pub mod keys;
pub mod movies;
pub mod queries;
pub mod search;
pub mod types;

pub use client::{TmdbClient, Transport, TransportError};
pub use queries::MovieQueries;
