use gasoline_actions::ActionCapture;
use gasoline_aicontext::SourceMapCache;
use gasoline_config::Limits;
use gasoline_context::ContextAnnotations;
use gasoline_network::PendingRequests;
use gasoline_performance::{MarkMeasureStore, VitalsTracker};
use gasoline_websocket::ConnectionRegistry;

use crate::interceptor::Interceptor;

/// Every piece of host-agnostic state a page-load's worth of capture
/// owns, plus the interceptor handles guarding each wrapped host API
/// (spec.md §4.14). `gasoline-web` owns one of these per installed page
/// and is the only thing that ever calls the `*_original` setters below;
/// this crate only enforces the state machine and aggregates resets.
pub struct Orchestrator<ConsoleOriginal, ErrorOriginal, RejectionOriginal, WsOriginal, FetchOriginal, PerfOriginal> {
    pub context: ContextAnnotations,
    pub actions: ActionCapture,
    pub pending_requests: PendingRequests,
    pub connections: ConnectionRegistry,
    pub performance: MarkMeasureStore,
    pub vitals: VitalsTracker,
    pub source_maps: SourceMapCache,

    pub console_interceptor: Interceptor<ConsoleOriginal>,
    pub error_interceptor: Interceptor<ErrorOriginal>,
    pub rejection_interceptor: Interceptor<RejectionOriginal>,
    pub websocket_interceptor: Interceptor<WsOriginal>,
    pub fetch_interceptor: Interceptor<FetchOriginal>,
    pub performance_interceptor: Interceptor<PerfOriginal>,
}

impl<ConsoleOriginal, ErrorOriginal, RejectionOriginal, WsOriginal, FetchOriginal, PerfOriginal>
    Orchestrator<ConsoleOriginal, ErrorOriginal, RejectionOriginal, WsOriginal, FetchOriginal, PerfOriginal>
{
    pub fn new(limits: &Limits) -> Self {
        Orchestrator {
            context: ContextAnnotations::new(),
            actions: ActionCapture::new(limits),
            pending_requests: PendingRequests::new(),
            connections: ConnectionRegistry::new(),
            performance: MarkMeasureStore::new(),
            vitals: VitalsTracker::new(),
            source_maps: SourceMapCache::new(limits.ai_source_map_cache_cap),

            console_interceptor: Interceptor::new(),
            error_interceptor: Interceptor::new(),
            rejection_interceptor: Interceptor::new(),
            websocket_interceptor: Interceptor::new(),
            fetch_interceptor: Interceptor::new(),
            performance_interceptor: Interceptor::new(),
        }
    }

    /// `true` once every interceptor this struct tracks has been
    /// installed. `gasoline-web`'s `install()` entry point installs them
    /// one at a time and can use this to assert full coverage.
    pub fn all_installed(&self) -> bool {
        self.console_interceptor.is_installed()
            && self.error_interceptor.is_installed()
            && self.rejection_interceptor.is_installed()
            && self.websocket_interceptor.is_installed()
            && self.fetch_interceptor.is_installed()
            && self.performance_interceptor.is_installed()
    }

    /// Clears every bounded buffer/cache back to its fresh-page state.
    /// Does not touch interceptor install state — tests that call this
    /// are expected to still be mid-install, per the existing per-module
    /// convention that `reset_for_testing` never un-does an `install`.
    pub fn reset_all_for_testing(&mut self, limits: &Limits) {
        self.context.reset_for_testing();
        self.actions.reset_for_testing();
        self.pending_requests.reset_for_testing();
        self.connections.reset_for_testing();
        self.performance.reset_for_testing();
        self.vitals.reset_for_testing();
        self.source_maps.reset_for_testing();
        let _ = limits;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestOrchestrator = Orchestrator<&'static str, &'static str, &'static str, &'static str, &'static str, &'static str>;

    #[test]
    fn fresh_orchestrator_has_nothing_installed() {
        let o = TestOrchestrator::new(&Limits::default());
        assert!(!o.all_installed());
    }

    #[test]
    fn installing_every_tap_flips_all_installed() {
        let mut o = TestOrchestrator::new(&Limits::default());
        o.console_interceptor.install("console.log").unwrap();
        o.error_interceptor.install("onerror").unwrap();
        o.rejection_interceptor.install("onunhandledrejection").unwrap();
        o.websocket_interceptor.install("WebSocket").unwrap();
        o.fetch_interceptor.install("fetch").unwrap();
        o.performance_interceptor.install("performance.mark").unwrap();
        assert!(o.all_installed());
    }

    #[test]
    fn reset_clears_bounded_state_without_touching_install() {
        let mut o = TestOrchestrator::new(&Limits::default());
        o.console_interceptor.install("console.log").unwrap();
        o.context.set("userId", serde_json::json!(1), &Limits::default()).unwrap();
        o.reset_all_for_testing(&Limits::default());
        assert!(o.context.is_empty());
        assert!(o.console_interceptor.is_installed());
    }
}
