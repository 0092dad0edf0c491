pub mod clock;
pub mod comments;
pub mod directory;
pub mod engine;
pub mod http;
pub mod model;
pub mod observability;
pub mod requests;
