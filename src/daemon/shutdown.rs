use tokio::select;
use tokio_util::sync::CancellationToken;

/// Detects signals sent to the process, or cancellation coming from elsewhere.
///
/// On Windows detached processes can't detect signals sent to them, so `habitual stop` kills the
/// process instead.
pub async fn detect_shutdown(cancelation: CancellationToken) {
    select! {
        _ = tokio::signal::ctrl_c() => {
            cancelation.cancel();
        },
        _ = cancelation.cancelled() => (),
    };
}
