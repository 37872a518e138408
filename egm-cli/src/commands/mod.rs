pub mod convert;
pub mod info;
pub mod list;
pub mod query;
