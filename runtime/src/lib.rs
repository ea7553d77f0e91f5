//! Runtime support for applications generated by routeforge.
//!
//! Generated record handlers derive [`Bind`] and implement [`Serve`]; the router mounts them
//! with [`serve::<T>`](serve()). The generated `main` calls [`init_logging`] and [`run`].

mod app;
mod bind;
mod context;
mod serve;
mod upload;

pub use app::{init_logging, run, App, ADDR_ENV};
pub use bind::{Bind, BindError, Cookie, FromParam, FromUpload, Source};
pub use context::{Context, UPLOAD_DIR_ENV};
pub use routeforge_runtime_macros::Bind;
pub use serve::{serve, Doc, Serve};
pub use upload::{SavedFile, UploadedFile};

#[doc(hidden)]
pub mod __private {
    pub use crate::bind::{bind_body, bind_param, bind_upload, Rules};
}
