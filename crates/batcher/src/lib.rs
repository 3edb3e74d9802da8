//! # Batcher
//!
//! 自适应批处理模块。
//!
//! 负责：
//! - 按 sink 探测延迟决定直发还是缓冲
//! - 以自适应节奏把缓冲区整批刷给 sink
//! - 关闭时排空缓冲区，再关闭 sink

mod buffer;
mod decision;
mod engine;
mod keyed;
mod latency;
mod prober;
mod scheduler;

pub mod error;
pub mod metrics;
pub mod sinks;

pub use buffer::PendingBuffer;
pub use contracts::{BatchSink, BatcherConfig, FailureEvent, FailureStage, LatencyEstimate, NextAvgFormula};
pub use decision::{evaluate, FlushEvaluation, FlushInputs, FlushReasons};
pub use engine::{Batcher, BatcherTasks};
pub use error::BatchError;
pub use keyed::KeyedBatcher;
pub use latency::LatencyModel;
pub use metrics::{BatcherMetrics, MetricsSnapshot};
pub use scheduler::{MAX_TICK_MILLIS, MIN_TICK_MILLIS};
pub use sinks::{ChannelSink, Delivery, LogSink};
