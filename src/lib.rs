pub mod analysis_cache;
pub mod backtest;
pub mod calibration;
pub mod engine;
pub mod h2h;
pub mod league_params;
pub mod match_store;
pub mod poisson;
pub mod telemetry;
