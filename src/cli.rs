//! Command-line interface

use clap::{Parser, Subcommand};
use hyper::Method;

use crate::routing::RouteTable;

#[derive(Debug, Parser)]
#[command(name = "hello_add", version, about = "Greeting and addition web service")]
pub struct Cli {
    /// Configuration file path (extension optional)
    #[arg(short, long, default_value = "config")]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Run the HTTP server (default)
    #[default]
    Serve,
    /// Print the routing table and exit
    Routes,
}

/// Render the routing table sorted by endpoint.
///
/// `HEAD` and `OPTIONS` are implied for every rule and left out.
pub fn render_routes<T>(routes: &RouteTable<T>) -> String {
    let mut rows: Vec<(String, String, String)> = routes
        .iter()
        .map(|route| {
            let methods = route
                .methods()
                .iter()
                .filter(|m| **m != Method::HEAD && **m != Method::OPTIONS)
                .map(Method::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            (
                route.endpoint().to_string(),
                methods,
                route.pattern().rule().to_string(),
            )
        })
        .collect();
    rows.sort();

    let headers = ("Endpoint", "Methods", "Rule");
    let endpoint_width = rows
        .iter()
        .map(|r| r.0.len())
        .chain(std::iter::once(headers.0.len()))
        .max()
        .unwrap_or(0);
    let methods_width = rows
        .iter()
        .map(|r| r.1.len())
        .chain(std::iter::once(headers.1.len()))
        .max()
        .unwrap_or(0);
    let rule_width = rows
        .iter()
        .map(|r| r.2.len())
        .chain(std::iter::once(headers.2.len()))
        .max()
        .unwrap_or(0);

    let mut out = format!(
        "{:<endpoint_width$}  {:<methods_width$}  {}\n{}  {}  {}\n",
        headers.0,
        headers.1,
        headers.2,
        "-".repeat(endpoint_width),
        "-".repeat(methods_width),
        "-".repeat(rule_width),
    );
    for (endpoint, methods, rule) in &rows {
        out.push_str(&format!(
            "{endpoint:<endpoint_width$}  {methods:<methods_width$}  {rule}\n"
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::create_app;

    #[test]
    fn test_parse_defaults() {
        let cli = Cli::parse_from(["hello_add"]);
        assert_eq!(cli.config, "config");
        assert_eq!(cli.command.unwrap_or_default(), Command::Serve);
    }

    #[test]
    fn test_parse_routes_with_config() {
        let cli = Cli::parse_from(["hello_add", "--config", "deploy/prod", "routes"]);
        assert_eq!(cli.config, "deploy/prod");
        assert_eq!(cli.command, Some(Command::Routes));
    }

    #[test]
    fn test_render_routes() {
        let app = create_app(None).unwrap();
        let table = render_routes(app.routes());
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "Endpoint  Methods  Rule");
        assert_eq!(lines[1], "--------  -------  --------------------------");
        assert_eq!(lines[2], "add       GET      /add/<int:num1>/<int:num2>");
        assert_eq!(lines[3], "index     GET      /");
    }
}
