pub mod finnhub;
pub mod market_data;

pub mod repository;
pub mod memory_repository;
pub mod mongo_repository;

pub mod evaluator;
pub mod alerts_service;
pub mod alert_monitor;
