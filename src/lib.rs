//! radcache - caching layer for the relational anomaly detection front-end.
//!
//! The interactive views (anomaly list, score trends, element labels) poll
//! the remote analytics engine; this crate memoizes those round-trips with
//! per-user, TTL-bounded, capacity-bounded caches. The engine itself is
//! reached through the [`gateway::AnalyticsGateway`] trait, with
//! [`gateway::HttpGateway`] as the production transport.
//!
//! Everything is process-memory only: the engine's store is durable, the
//! caches exist purely to take load off it and reset on restart.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use radcache::{AnomalyListCache, CacheConfig, HttpGateway};
//!
//! let gateway = Arc::new(HttpGateway::new("https://dma-1.example.net")?.with_token(token));
//! let anomalies = AnomalyListCache::new(gateway, CacheConfig::default());
//! let list = anomalies.get("DOMAIN\\operator")?;
//! ```

pub mod cache;
pub mod config;
pub mod gateway;
pub mod models;

pub use cache::{AnomalyListCache, CacheError, EntityCache, EntityKey, ScoreKey, ScoreSeriesCache};
pub use config::CacheConfig;
pub use gateway::{AnalyticsGateway, GatewayError, HttpGateway, SeriesShape};
pub use models::{AnomalyRecord, ElementInfo, ScorePoint};
