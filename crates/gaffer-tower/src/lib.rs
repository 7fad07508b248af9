//! Small [`tower`] helpers shared by the gaffer-query crates

use std::pin::Pin;

use futures::Future;
use tower::Service;


/// Boxed future returned by the services in this workspace
pub type ResponseFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// Swaps a ready service out for a fresh clone, returning the ready one.
///
/// A clone of a service is not guaranteed to be ready, so the instance that
/// was driven through `poll_ready` is the one that must receive the call.
pub fn take_ready_service<S, Req>(ready: &mut S) -> S
where
    S: Service<Req> + Clone,
{
    let fresh = ready.clone();
    std::mem::replace(ready, fresh)
}

#[cfg(test)]
mod tests {
    use std::{
        convert::Infallible,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
        task::{Context, Poll},
    };

    use futures::future::{ready, Ready};
    use tower::Service;

    use super::take_ready_service;

    #[derive(Clone)]
    struct Counting {
        calls: Arc<AtomicUsize>,
        ready: bool,
    }

    impl Service<()> for Counting {
        type Response = usize;
        type Error = Infallible;
        type Future = Ready<Result<usize, Infallible>>;

        fn poll_ready(&mut self, _: &mut Context<'_>) -> Poll<Result<(), Infallible>> {
            self.ready = true;
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, _: ()) -> Self::Future {
            assert!(self.ready, "called before poll_ready");
            ready(Ok(self.calls.fetch_add(1, Ordering::SeqCst) + 1))
        }
    }

    #[tokio::test]
    async fn it_hands_back_the_polled_instance() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut service = Counting {
            calls: calls.clone(),
            ready: false,
        };
        let waker = futures::task::noop_waker();
        let mut cx = Context::from_waker(&waker);
        let _ = service.poll_ready(&mut cx);

        let mut taken = take_ready_service::<_, ()>(&mut service);
        assert_eq!(taken.call(()).await, Ok(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
