pub mod client;
pub mod csv_cache;
pub mod eastmoney;
pub mod fallback;
pub mod limits;
pub mod sina;
