pub mod analyze;
pub mod prices;
pub mod products;
pub mod ui;
