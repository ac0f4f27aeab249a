pub mod alert_service;
pub mod analysis_service;
pub mod indicators;
pub mod market_data_service;
pub mod position_service;
pub mod valuation_service;
