pub mod constants;
pub mod matcher;
pub mod table;
