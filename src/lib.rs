pub mod config;
pub mod diagram;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod state;
pub mod storage;
pub mod test_helpers;
