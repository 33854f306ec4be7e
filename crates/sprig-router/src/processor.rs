//! Per-node bundle of routed components.

use std::ops::ControlFlow;

use crate::component::{
    ComponentMut, Filter, Handler, MethodHandler, TaskHandler, WebSocketHandler,
};
use crate::pattern::VarMap;

/// A component in a single-occupancy slot, with the variables of the
/// pattern it was registered under.
pub(crate) struct Slot<T> {
    pub(crate) component: T,
    pub(crate) vars: VarMap,
    pub(crate) pattern: String,
}

/// Content of the handler slot.
pub(crate) enum Endpoint {
    /// Built from method-scoped registrations; further methods may be
    /// added to it while the router is being built.
    Methods(MethodHandler),
    Custom(Box<dyn Handler>),
}

impl Endpoint {
    pub(crate) fn as_handler(&self) -> &dyn Handler {
        match self {
            Self::Methods(m) => m,
            Self::Custom(h) => h.as_ref(),
        }
    }

    fn as_handler_mut(&mut self) -> &mut dyn Handler {
        match self {
            Self::Methods(m) => m,
            Self::Custom(h) => h.as_mut(),
        }
    }
}

/// Everything registered on one tree node.
#[derive(Default)]
pub(crate) struct RouteProcessor {
    pub(crate) handler: Option<Slot<Endpoint>>,
    pub(crate) websocket: Option<Slot<Box<dyn WebSocketHandler>>>,
    pub(crate) task: Option<Slot<Box<dyn TaskHandler>>>,
    pub(crate) filters: Vec<Box<dyn Filter>>,
}

impl RouteProcessor {
    /// Visits the handler, the filters in registration order, the websocket
    /// handler and the task handler; stops at the first `Break`.
    pub(crate) fn visit<B, F>(&mut self, f: &mut F) -> ControlFlow<B>
    where
        F: FnMut(ComponentMut<'_>) -> ControlFlow<B>,
    {
        if let Some(slot) = &mut self.handler {
            f(ComponentMut::Handler(slot.component.as_handler_mut()))?;
        }
        for filter in &mut self.filters {
            f(ComponentMut::Filter(filter.as_mut()))?;
        }
        if let Some(slot) = &mut self.websocket {
            f(ComponentMut::WebSocket(slot.component.as_mut()))?;
        }
        if let Some(slot) = &mut self.task {
            f(ComponentMut::Task(slot.component.as_mut()))?;
        }
        ControlFlow::Continue(())
    }

    /// Destroys every component in visiting order and empties the slots.
    /// Returns how many components were destroyed.
    pub(crate) fn destroy(&mut self) -> usize {
        let mut destroyed = 0;
        if let Some(mut slot) = self.handler.take() {
            slot.component.as_handler_mut().destroy();
            destroyed += 1;
        }
        for mut filter in self.filters.drain(..) {
            filter.destroy();
            destroyed += 1;
        }
        if let Some(mut slot) = self.websocket.take() {
            slot.component.destroy();
            destroyed += 1;
        }
        if let Some(mut slot) = self.task.take() {
            slot.component.destroy();
            destroyed += 1;
        }
        destroyed
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::component::{BoxFuture, FilterResult};
    use crate::request::Request;

    struct CountingFilter(Arc<AtomicUsize>);

    impl Filter for CountingFilter {
        fn before<'a>(&'a self, req: &'a Request) -> BoxFuture<'a, FilterResult> {
            Box::pin(async move { FilterResult::Continue(req.clone()) })
        }

        fn destroy(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn slot<T>(component: T) -> Slot<T> {
        Slot {
            component,
            vars: VarMap::default(),
            pattern: "/".to_string(),
        }
    }

    #[test]
    fn test_visit_order_and_break() {
        let destroyed = Arc::new(AtomicUsize::new(0));
        let mut rp = RouteProcessor {
            handler: Some(slot(Endpoint::Methods(MethodHandler::new()))),
            filters: vec![
                Box::new(CountingFilter(destroyed.clone())) as Box<dyn Filter>,
                Box::new(CountingFilter(destroyed.clone())),
            ],
            ..RouteProcessor::default()
        };

        let mut seen = Vec::new();
        let flow = rp.visit(&mut |c| {
            seen.push(match c {
                ComponentMut::Handler(_) => "handler",
                ComponentMut::Filter(_) => "filter",
                ComponentMut::WebSocket(_) => "websocket",
                ComponentMut::Task(_) => "task",
            });
            if seen.len() == 2 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        assert_eq!(flow, ControlFlow::Break(()));
        assert_eq!(seen, ["handler", "filter"]);

        assert_eq!(rp.destroy(), 3);
        assert_eq!(destroyed.load(Ordering::SeqCst), 2);
        assert!(rp.handler.is_none());
        assert!(rp.filters.is_empty());
        assert_eq!(rp.destroy(), 0);
    }
}
