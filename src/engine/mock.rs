/*!
 * Mock engine implementations for testing.
 *
 * This module provides a mock engine that simulates different behaviors:
 * - `MockEngine::working()` - Reports progress and returns both documents
 * - `MockEngine::failing()` - Always fails with an error
 * - `MockEngine::missing_bilingual()` - Returns only the monolingual document
 * - `MockEngine::out_of_order()` - Reports progress events in shuffled order
 * - `MockEngine::scripted(..)` - Reports a fixed list of events
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use futures::future::join_all;
use parking_lot::Mutex;

use crate::engine::{EngineOutput, EngineProgress, EngineRequest, ProgressCallback, TranslationEngine};
use crate::errors::ProviderError;

/// Behavior mode for the mock engine
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// Splits the work across `concurrency` workers and succeeds
    Working { units: u64 },
    /// Reports the given `(completed, total)` events in order, then succeeds
    Scripted { events: Vec<(u64, u64)> },
    /// Reports events newest-first, then succeeds
    OutOfOrder { units: u64 },
    /// Succeeds without the bilingual document
    MissingBilingual,
    /// Reports some progress, then fails with the message
    Failing { message: String },
    /// Sleeps before succeeding (for progress polling tests)
    Slow { delay_ms: u64, units: u64 },
}

/// What the mock saw on its last call
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub request: EngineRequest,
}

/// Mock engine for testing job behavior without a translation service
#[derive(Debug)]
pub struct MockEngine {
    behavior: MockBehavior,
    call_count: Arc<AtomicUsize>,
    last_call: Arc<Mutex<Option<RecordedCall>>>,
}

impl MockEngine {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            call_count: Arc::new(AtomicUsize::new(0)),
            last_call: Arc::new(Mutex::new(None)),
        }
    }

    /// A working engine with ten units of work
    pub fn working() -> Self {
        Self::new(MockBehavior::Working { units: 10 })
    }

    pub fn scripted(events: Vec<(u64, u64)>) -> Self {
        Self::new(MockBehavior::Scripted { events })
    }

    pub fn out_of_order(units: u64) -> Self {
        Self::new(MockBehavior::OutOfOrder { units })
    }

    pub fn missing_bilingual() -> Self {
        Self::new(MockBehavior::MissingBilingual)
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self::new(MockBehavior::Failing { message: message.into() })
    }

    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms, units: 4 })
    }

    /// Number of `translate` calls so far
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn last_call(&self) -> Option<RecordedCall> {
        self.last_call.lock().clone()
    }

    /// Documents derived from the input so each artifact is distinct and non-empty
    pub fn render(request: &EngineRequest) -> (Bytes, Bytes) {
        let render = |kind: &str| {
            let mut buf = BytesMut::new();
            buf.put_slice(
                format!("%PDF-1.7 {} {}->{}\n", kind, request.source_language, request.target_language)
                    .as_bytes(),
            );
            buf.put_slice(&request.document.bytes);
            buf.freeze()
        };
        (render("mono"), render("dual"))
    }

    /// Split `units` across the requested workers, each reporting as it goes
    async fn run_workers(units: u64, concurrency: u8, progress: &ProgressCallback) {
        let workers = u64::from(concurrency.max(1));
        let done = Arc::new(AtomicUsize::new(0));

        let tasks = (0..workers).map(|worker| {
            let progress = Arc::clone(progress);
            let done = Arc::clone(&done);
            async move {
                let share = (worker..units).step_by(workers as usize).count();
                for _ in 0..share {
                    tokio::task::yield_now().await;
                    let completed = done.fetch_add(1, Ordering::SeqCst) as u64 + 1;
                    progress(EngineProgress::new(
                        completed,
                        units,
                        Some(format!("Translating page {}/{}", completed, units)),
                    ));
                }
            }
        });

        join_all(tasks).await;
    }
}

impl Clone for MockEngine {
    fn clone(&self) -> Self {
        Self {
            behavior: self.behavior.clone(),
            call_count: Arc::clone(&self.call_count),
            last_call: Arc::clone(&self.last_call),
        }
    }
}

#[async_trait]
impl TranslationEngine for MockEngine {
    fn name(&self) -> &str {
        "mock"
    }

    async fn translate(
        &self,
        request: EngineRequest,
        progress: ProgressCallback,
    ) -> Result<EngineOutput, ProviderError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        *self.last_call.lock() = Some(RecordedCall { request: request.clone() });

        // Unknown total first; the aggregator must ignore it.
        progress(EngineProgress::new(0, 0, None));

        match &self.behavior {
            MockBehavior::Working { units } => {
                Self::run_workers(*units, request.concurrency, &progress).await;
            }
            MockBehavior::Scripted { events } => {
                for (completed, total) in events {
                    progress(EngineProgress::new(*completed, *total, None));
                }
            }
            MockBehavior::OutOfOrder { units } => {
                for completed in (1..=*units).rev() {
                    progress(EngineProgress::new(completed, *units, None));
                }
            }
            MockBehavior::MissingBilingual => {
                let (mono, _) = Self::render(&request);
                return Ok(EngineOutput {
                    monolingual: Some(mono),
                    bilingual: None,
                });
            }
            MockBehavior::Failing { message } => {
                progress(EngineProgress::new(1, 10, None));
                return Err(ProviderError::ApiError {
                    status_code: 500,
                    message: message.clone(),
                });
            }
            MockBehavior::Slow { delay_ms, units } => {
                for completed in 1..=*units {
                    tokio::time::sleep(tokio::time::Duration::from_millis(*delay_ms)).await;
                    progress(EngineProgress::new(completed, *units, None));
                }
            }
        }

        let (mono, dual) = Self::render(&request);
        Ok(EngineOutput {
            monolingual: Some(mono),
            bilingual: Some(dual),
        })
    }
}
