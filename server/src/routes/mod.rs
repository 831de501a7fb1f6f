use eyre::{Context, Result};

pub mod asset;
pub mod branding;
pub mod rendition;

/// Runs blocking file and image work on the rayon pool and waits for it
/// without holding up the async runtime.
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let span = tracing::Span::current();
    let (tx, rx) = tokio::sync::oneshot::channel::<T>();
    rayon::spawn(move || {
        let _entered = span.enter();
        // receiver is gone if the request was dropped
        let _ = tx.send(f());
    });
    rx.await.wrap_err("blocking task did not complete")
}
