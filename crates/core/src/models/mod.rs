pub mod alert;
pub mod analysis;
pub mod currency;
pub mod holding;
pub mod ledger;
pub mod position;
pub mod price;
pub mod quote;
pub mod settings;
pub mod summary;
pub mod symbol;
