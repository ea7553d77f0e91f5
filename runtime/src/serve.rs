//! The record-handler contract and the axum handler that drives it.

use axum::extract::Request;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::future::Future;
use tracing::debug;

use crate::bind::Bind;
use crate::context::Context;

/// Human-readable API documentation attached to a handler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Doc {
    pub note: &'static str,
    pub returns: &'static str,
}

/// A handler whose state is bound from the request before it runs.
pub trait Serve: Sized + Send + 'static {
    fn serve(self, ctx: &mut Context) -> impl Future<Output = Response> + Send;

    fn doc() -> Doc {
        Doc::default()
    }
}

/// Read the request, bind `T` from it and run it.
///
/// Unreadable requests and binding failures are answered with a JSON `{"error": ...}` body.
pub async fn serve<T: Bind + Serve>(req: Request) -> Response {
    let mut ctx = match Context::from_request(req).await {
        Ok(ctx) => ctx,
        Err(err) => return err.into_response(),
    };
    let state = match T::bind(&ctx) {
        Ok(state) => state,
        Err(err) => {
            debug!(handler = std::any::type_name::<T>(), error = %err, "binding rejected");
            return err.into_response();
        }
    };
    state.serve(&mut ctx).await
}
