pub mod errors;
pub mod graphql;
pub mod json_schema;
pub mod operations;
pub mod pagination;
pub mod schedule;
pub mod server;
pub mod session;
pub mod tools;
