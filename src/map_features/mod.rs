pub mod builder;
pub mod tags;
