//! Built-in applications.
//!
//! - `main/index`: default handler; unknown URIs land here with parameters
//!   and get a 404
//! - `main/error`: error page rendered from `{code, title, message}`
//! - `myapp/api`: RESTful `hello` action
//! - `myapp/stream`: chunked output demo

pub mod myapp;
pub mod site;

use askama::filters::{Escaper, Html};

use crate::handler::HandlerRegistry;

/// Register every built-in handler.
pub fn register(handlers: &mut HandlerRegistry) {
    site::register(handlers);
    myapp::register(handlers);
}

/// HTML-escape text interpolated into pages.
pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    // Writing into a String cannot fail.
    let _ = Html.write_escaped_str(&mut out, text);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<b>R&D</b>"), "&lt;b&gt;R&amp;D&lt;/b&gt;");
        assert!(!escape_html("\"quoted\" 'single'").contains(['"', '\'']));
        assert_eq!(escape_html("plain"), "plain");
    }
}
