pub mod inventory;
pub mod migrate;
