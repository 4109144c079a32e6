use std::future::poll_fn;
use std::task::Poll;

/// Yields execution back to the scheduler.
///
/// The current task goes to the back of the run queue so that other ready
/// tasks can make progress before it continues.
///
/// # Examples
///
/// ```rust,ignore
/// async fn task() {
///     corio::task::yield_now().await;
/// }
/// ```
pub async fn yield_now() {
    let mut yielded = false;

    poll_fn(|cx| {
        if yielded {
            return Poll::Ready(());
        }

        yielded = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    })
    .await
}
