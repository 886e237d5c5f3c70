pub mod bootstrap;
pub mod commands;
pub mod end_of_day;
