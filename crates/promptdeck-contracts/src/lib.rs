pub mod events;
pub mod models;
pub mod request;
pub mod response;
pub mod session;
