pub mod backtest;
pub mod cancel_all;
pub mod status;
pub mod trade;
