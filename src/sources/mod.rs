pub mod binance_ws;
pub mod coingecko;

pub use binance_ws::BinanceWs;
pub use coingecko::CoinGeckoClient;
