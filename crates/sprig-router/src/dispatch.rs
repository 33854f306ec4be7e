//! Request dispatch on top of the route table.

use crate::component::{BoxFuture, FilterResult};
use crate::request::Request;
use crate::response::Response;
use crate::router::{HandlerMatch, Router};

impl Router {
    /// Routes `request` and produces its response.
    ///
    /// The filters along the path run their `before` hook root first. A
    /// filter that answers stops the chain and its answer replaces the
    /// handler's. Otherwise the path variables are copied into
    /// `request.params` and the handler runs; a path without a handler
    /// yields 404, a handler without the request's method yields 405.
    /// Finally the `after` hook of every filter that let the request
    /// through runs, innermost first.
    pub fn handle(&self, request: Request) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            let mut request = request;
            let path = request.path.clone();
            let HandlerMatch {
                handler,
                vars,
                filters,
                ..
            } = self.match_handler_filters(&path);
            request.params = vars.to_params();
            drop(vars);

            let mut passed = 0;
            let mut answered = None;
            for filter in &filters {
                let result = filter.before(&request).await;
                match result {
                    FilterResult::Continue(req) => {
                        request = req;
                        passed += 1;
                    }
                    FilterResult::Response(res) => {
                        answered = Some(res);
                        break;
                    }
                }
            }

            let mut response = match answered {
                Some(res) => res,
                None => match handler {
                    None => Response::not_found(),
                    Some(handler) => match handler.handle_func(request.method) {
                        Some(func) => func(request).await,
                        None => Response::method_not_allowed(),
                    },
                },
            };

            for filter in filters[..passed].iter().rev() {
                response = filter.after(response).await;
            }
            response
        })
    }
}
