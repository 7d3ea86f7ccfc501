//! Application factory
//!
//! Builds the route registry the server dispatches into. The application is
//! immutable once built and is shared by every connection task.

mod views;

use hyper::Method;
use thiserror::Error;

use crate::config::AppConfig;
use crate::routing::{ParamError, PathParams, RouteTable, RoutingError};

/// View function signature: converted path parameters in, response text out
pub type View = fn(&PathParams) -> Result<String, ViewError>;

/// Errors a view can return; rendered as 500 by the dispatcher
#[derive(Debug, Error)]
pub enum ViewError {
    #[error(transparent)]
    Param(#[from] ParamError),
}

/// Configured application
pub struct App {
    name: String,
    routes: RouteTable<View>,
}

impl App {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn routes(&self) -> &RouteTable<View> {
        &self.routes
    }
}

/// Construct the application with its routes registered.
///
/// `config` is optional; defaults apply when it is `None`.
pub fn create_app(config: Option<&AppConfig>) -> Result<App, RoutingError> {
    let name = config.cloned().unwrap_or_default().name;

    let mut routes: RouteTable<View> = RouteTable::new();
    routes.add("index", "/", &[Method::GET], views::index)?;
    routes.add(
        "add",
        "/add/<int:num1>/<int:num2>",
        &[Method::GET],
        views::add,
    )?;

    Ok(App { name, routes })
}
