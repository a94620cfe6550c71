pub mod connection;
pub mod dispatcher;
pub mod router;
pub mod session;
