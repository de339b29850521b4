pub mod alpha_vantage;
pub mod mock;
pub mod series_cache;
