#![forbid(unsafe_code)]

pub mod csv;
pub mod repository;
pub mod sqlite;
