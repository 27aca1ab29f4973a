//! Timing primitives shared by every capture module: a synchronous
//! throttle/debounce gate (for high-frequency DOM events) and an async
//! race-with-timeout combinator that "resolves to a typed fallback rather
//! than rejecting" (spec.md §9) so a slow host call never blocks the
//! caller past its budget. Timeouts never cancel the underlying work —
//! they race against it and the loser's result is simply discarded.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};

/// Anything that can report a monotonic wall-clock-like millisecond
/// count. In production this is backed by `performance.now()`; tests use
/// a `FakeClock`.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// A clock a test can advance by hand.
#[derive(Debug, Clone, Default)]
pub struct FakeClock {
    now: Arc<Mutex<u64>>,
}

impl FakeClock {
    pub fn new(start_ms: u64) -> Self {
        FakeClock {
            now: Arc::new(Mutex::new(start_ms)),
        }
    }

    pub fn advance(&self, delta_ms: u64) {
        *self.now.lock().expect("fake clock lock poisoned") += delta_ms;
    }
}

impl Clock for FakeClock {
    fn now_ms(&self) -> u64 {
        *self.now.lock().expect("fake clock lock poisoned")
    }
}

/// Fires at most once per `interval_ms`. Used by scroll capture (one
/// event per 250ms) and by anything else that needs "allow now?" gating
/// without deferring the call.
#[derive(Debug, Clone)]
pub struct Throttle {
    interval_ms: u64,
    last_fired_ms: Option<u64>,
}

impl Throttle {
    pub fn new(interval_ms: u64) -> Self {
        Throttle {
            interval_ms,
            last_fired_ms: None,
        }
    }

    /// Returns `true` if the caller should act now, and records that
    /// firing. Never holds a timer; purely a function of `now_ms`.
    pub fn should_fire(&mut self, now_ms: u64) -> bool {
        match self.last_fired_ms {
            Some(last) if now_ms.saturating_sub(last) < self.interval_ms => false,
            _ => {
                self.last_fired_ms = Some(now_ms);
                true
            }
        }
    }

    pub fn reset(&mut self) {
        self.last_fired_ms = None;
    }
}

/// Suppresses calls until `quiet_ms` has elapsed since the last one;
/// every call restarts the window. Unlike [`Throttle`], reports only
/// whether the current call falls inside or outside the quiet window —
/// actually deferring a call belongs to the caller's event loop.
#[derive(Debug, Clone)]
pub struct Debounce {
    quiet_ms: u64,
    last_call_ms: Option<u64>,
}

impl Debounce {
    pub fn new(quiet_ms: u64) -> Self {
        Debounce {
            quiet_ms,
            last_call_ms: None,
        }
    }

    /// Returns `true` if `now_ms` falls outside the quiet window opened
    /// by the previous call (i.e. the debounce "settled"). Always
    /// records `now_ms` as the new window start.
    pub fn settled(&mut self, now_ms: u64) -> bool {
        let settled = match self.last_call_ms {
            Some(last) => now_ms.saturating_sub(last) >= self.quiet_ms,
            None => true,
        };
        self.last_call_ms = Some(now_ms);
        settled
    }
}

/// Races two same-output futures and resolves to whichever is ready
/// first. Both sub-futures must be `Unpin`, which holds for every
/// concrete future this crate constructs (boxed host timers, and the
/// [`Deferred`] future below).
pub struct Race<A, B> {
    a: A,
    b: B,
}

impl<T, A, B> Future for Race<A, B>
where
    A: Future<Output = T> + Unpin,
    B: Future<Output = T> + Unpin,
{
    type Output = T;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        if let Poll::Ready(v) = Pin::new(&mut self.a).poll(cx) {
            return Poll::Ready(v);
        }
        Pin::new(&mut self.b).poll(cx)
    }
}

pub fn race<T, A, B>(a: A, b: B) -> Race<A, B>
where
    A: Future<Output = T> + Unpin,
    B: Future<Output = T> + Unpin,
{
    Race { a, b }
}

/// Adapts any `Future<Output = ()>` timer into one that yields `fallback`
/// when it fires, so it can be raced against real work of the same
/// output type via [`race`].
pub struct MapToFallback<S, T> {
    sleep: S,
    fallback: Option<T>,
}

impl<S, T> MapToFallback<S, T> {
    pub fn new(sleep: S, fallback: T) -> Self {
        MapToFallback {
            sleep,
            fallback: Some(fallback),
        }
    }
}

impl<S, T> Future for MapToFallback<S, T>
where
    S: Future<Output = ()> + Unpin,
{
    type Output = T;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        match Pin::new(&mut self.sleep).poll(cx) {
            Poll::Ready(()) => Poll::Ready(
                self.fallback
                    .take()
                    .expect("MapToFallback polled again after completion"),
            ),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Races `work` against a host-provided `timer` (a future that resolves
/// in `timer`'s own time, typically backed by `setTimeout`). On timeout,
/// yields `fallback`; `work` is left to run to completion and its result
/// is discarded if it loses the race.
pub fn race_with_timeout<T, W, S>(work: W, timer: S, fallback: T) -> Race<W, MapToFallback<S, T>>
where
    W: Future<Output = T> + Unpin,
    S: Future<Output = ()> + Unpin,
{
    race(work, MapToFallback::new(timer, fallback))
}

#[derive(Default)]
struct DeferredState<T> {
    value: Option<T>,
    waker: Option<Waker>,
}

/// A one-shot, resolve-from-the-outside value slot, analogous to a JS
/// `Promise`'s `resolve` function paired with the promise itself. Used
/// to bridge a host callback (e.g. a `setTimeout`/event-loop completion)
/// back into an `.await`-able future.
pub struct Deferred<T> {
    state: Arc<Mutex<DeferredState<T>>>,
}

/// The awaitable half of a [`Deferred`].
pub struct DeferredFuture<T> {
    state: Arc<Mutex<DeferredState<T>>>,
}

impl<T> Deferred<T> {
    pub fn new() -> (Deferred<T>, DeferredFuture<T>) {
        let state = Arc::new(Mutex::new(DeferredState {
            value: None,
            waker: None,
        }));
        (
            Deferred {
                state: state.clone(),
            },
            DeferredFuture { state },
        )
    }

    /// Resolves the paired future. A second call is a no-op (first
    /// resolution wins), matching "surplus work completes and is
    /// discarded" (spec.md §5).
    pub fn resolve(&self, value: T) {
        let mut guard = self.state.lock().expect("deferred lock poisoned");
        if guard.value.is_some() {
            return;
        }
        guard.value = Some(value);
        if let Some(waker) = guard.waker.take() {
            waker.wake();
        }
    }
}

impl<T> Future for DeferredFuture<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        let mut guard = self.state.lock().expect("deferred lock poisoned");
        if let Some(value) = guard.value.take() {
            return Poll::Ready(value);
        }
        guard.waker = Some(cx.waker().clone());
        Poll::Pending
    }
}

impl<T> Unpin for DeferredFuture<T> {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::task::{RawWaker, RawWakerVTable, Waker};

    fn noop_waker() -> Waker {
        fn clone(_: *const ()) -> RawWaker {
            raw()
        }
        fn noop(_: *const ()) {}
        fn raw() -> RawWaker {
            static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, noop, noop, noop);
            RawWaker::new(std::ptr::null(), &VTABLE)
        }
        unsafe { Waker::from_raw(raw()) }
    }

    #[test]
    fn throttle_allows_first_then_blocks_within_window() {
        let mut t = Throttle::new(250);
        assert!(t.should_fire(0));
        assert!(!t.should_fire(100));
        assert!(!t.should_fire(249));
        assert!(t.should_fire(250));
    }

    #[test]
    fn debounce_settles_only_after_quiet_period() {
        let mut d = Debounce::new(100);
        assert!(d.settled(0));
        assert!(!d.settled(50));
        assert!(d.settled(200));
    }

    #[test]
    fn deferred_resolves_once() {
        let (deferred, mut fut) = Deferred::<u32>::new();
        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);
        assert_eq!(Pin::new(&mut fut).poll(&mut cx), Poll::Pending);
        deferred.resolve(7);
        deferred.resolve(99); // second resolve is a no-op
        assert_eq!(Pin::new(&mut fut).poll(&mut cx), Poll::Ready(7));
    }

    struct Immediate<T>(Option<T>);
    impl<T: Unpin> Future for Immediate<T> {
        type Output = T;
        fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<T> {
            Poll::Ready(self.0.take().expect("polled twice"))
        }
    }

    struct Never;
    impl Future for Never {
        type Output = ();
        fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
            Poll::Pending
        }
    }

    #[test]
    fn race_with_timeout_prefers_ready_work_over_pending_timer() {
        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);
        let mut fut = race_with_timeout(Immediate(Some(1u32)), Never, 0u32);
        assert_eq!(Pin::new(&mut fut).poll(&mut cx), Poll::Ready(1));
    }

    #[test]
    fn race_with_timeout_falls_back_when_timer_fires() {
        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);
        struct PendingForever;
        impl Future for PendingForever {
            type Output = u32;
            fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<u32> {
                Poll::Pending
            }
        }
        let mut fut = race_with_timeout(PendingForever, Immediate(Some(())), 42u32);
        assert_eq!(Pin::new(&mut fut).poll(&mut cx), Poll::Ready(42));
    }
}
