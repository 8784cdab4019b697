pub mod config;
pub mod logging;

pub mod command;
pub mod layout;
pub mod lifecycle;
pub mod lock;
pub mod order;
pub mod pipeline;
pub mod pool;
pub mod resolve;
pub mod retention;
