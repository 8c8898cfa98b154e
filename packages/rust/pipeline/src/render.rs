//! Shared page-rendering capability for script-executed HTML.
//!
//! A renderer (e.g. a headless browser wrapper) is expensive to start, so a
//! single process-wide instance is initialized lazily on first use and
//! reused across pipeline runs until [`SharedRenderer::close`] tears it
//! down at crawl shutdown. Initialization is single-flight: concurrent first
//! uses wait for one initialization instead of racing their own.

use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};

use docsweep_shared::Result;

/// Capability for rendering a page with its scripts executed.
///
/// Implementations own their timeout policy; the pipeline never times a
/// render out on its own.
#[async_trait::async_trait]
pub trait PageRenderer: Send + Sync {
    /// Render the page at `url`, given the statically fetched markup, and
    /// return the final serialized DOM.
    async fn render(&self, url: &str, static_html: &str) -> Result<String>;

    /// Release the underlying engine.
    async fn shutdown(&self);
}

/// Factory producing the process-wide renderer instance on first use.
pub type RendererFactory =
    Box<dyn Fn() -> futures::future::BoxFuture<'static, Result<Arc<dyn PageRenderer>>> + Send + Sync>;

/// Lazily initialized, shared handle to one renderer instance.
pub struct SharedRenderer {
    factory: Mutex<Option<RendererFactory>>,
    cell: OnceCell<Arc<dyn PageRenderer>>,
}

impl SharedRenderer {
    /// Create a handle that will build its renderer with `factory` on first
    /// use.
    pub fn new(factory: RendererFactory) -> Self {
        Self {
            factory: Mutex::new(Some(factory)),
            cell: OnceCell::new(),
        }
    }

    /// Get the renderer, initializing it on the first call. Concurrent
    /// callers share a single initialization.
    pub async fn get(&self) -> Result<Arc<dyn PageRenderer>> {
        let renderer = self
            .cell
            .get_or_try_init(|| async {
                let factory = self.factory.lock().await.take().ok_or_else(|| {
                    docsweep_shared::DocsweepError::config("renderer already shut down")
                })?;
                tracing::info!("initializing shared page renderer");
                factory().await
            })
            .await?;
        Ok(renderer.clone())
    }

    /// Shut the renderer down if it was ever initialized.
    pub async fn close(&self) {
        if let Some(renderer) = self.cell.get() {
            tracing::info!("shutting down shared page renderer");
            renderer.shutdown().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingRenderer {
        renders: AtomicUsize,
        shutdowns: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl PageRenderer for CountingRenderer {
        async fn render(&self, _url: &str, static_html: &str) -> Result<String> {
            self.renders.fetch_add(1, Ordering::SeqCst);
            Ok(format!("{static_html}<!-- rendered -->"))
        }

        async fn shutdown(&self) {
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn initializes_once_across_concurrent_use() {
        let inits = Arc::new(AtomicUsize::new(0));
        let shutdowns = Arc::new(AtomicUsize::new(0));

        let inits_clone = inits.clone();
        let shutdowns_clone = shutdowns.clone();
        let factory: RendererFactory = Box::new(move || {
            let inits = inits_clone.clone();
            let shutdowns = shutdowns_clone.clone();
            Box::pin(async move {
                inits.fetch_add(1, Ordering::SeqCst);
                let renderer: Arc<dyn PageRenderer> = Arc::new(CountingRenderer {
                    renders: AtomicUsize::new(0),
                    shutdowns,
                });
                Ok(renderer)
            })
        });
        let shared = Arc::new(SharedRenderer::new(factory));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let shared = shared.clone();
            handles.push(tokio::spawn(async move {
                let renderer = shared.get().await.unwrap();
                renderer.render("https://example.com/", "<p>x</p>").await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(inits.load(Ordering::SeqCst), 1);

        shared.close().await;
        assert_eq!(shutdowns.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn close_without_use_is_a_no_op() {
        let factory: RendererFactory =
            Box::new(|| Box::pin(async { unreachable!("factory must not run") }));
        let shared = SharedRenderer::new(factory);
        shared.close().await;
    }
}
