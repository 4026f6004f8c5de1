//! Documentation served by the relay.
//!
//! Everything here is rendered once at startup: the OpenAPI document (with
//! `/proxy/` paths), its pretty-printed text form and the HTML landing page.

use ctxstack_common::protocol::catalog::CONTEXT_FUNCTIONS;
use ctxstack_common::protocol::OpenApiDocument;

/// Pre-rendered relay documentation.
#[derive(Debug, Clone)]
pub struct RelayDocs {
    openapi: OpenApiDocument,
    landing_page: String,
}

impl RelayDocs {
    /// Renders the documentation for a relay named `service_name` reachable
    /// at `public_url`.
    pub fn build(service_name: &str, public_url: &str) -> Self {
        let openapi = OpenApiDocument::build_titled(
            "/proxy/",
            &format!("{} Relay", service_name),
            &format!("A relay server for the {} context server", service_name),
        );
        Self {
            openapi,
            landing_page: render_landing_page(service_name, public_url),
        }
    }

    pub fn openapi(&self) -> &OpenApiDocument {
        &self.openapi
    }

    pub fn landing_page(&self) -> &str {
        &self.landing_page
    }
}

const STYLE: &str = "\
        body { font-family: Arial, sans-serif; margin: 40px; line-height: 1.6; }
        h1 { color: #333; }
        h2 { color: #444; margin-top: 30px; }
        pre { background-color: #f4f4f4; padding: 10px; border-radius: 5px; overflow-x: auto; }
        a { color: #0066cc; text-decoration: none; }
        a:hover { text-decoration: underline; }
        .endpoint { margin-bottom: 20px; }
        .description { margin-bottom: 10px; }";

fn render_landing_page(service_name: &str, public_url: &str) -> String {
    let name = escape_html(service_name);
    let url = escape_html(public_url);

    let mut html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>{name} Relay API</title>
    <style>
{STYLE}
    </style>
</head>
<body>
    <h1>{name} Relay API</h1>
    <p>This API relays context management operations to the {name} context server.</p>

    <h2>API Documentation</h2>
    <ul>
        <li><a href="/openapi.json">OpenAPI Specification (JSON)</a></li>
        <li><a href="/openapi.txt">OpenAPI Specification (Text)</a></li>
    </ul>

    <h2>Health Check</h2>
    <div class="endpoint">
        <p class="description">Check if the API is healthy:</p>
        <pre>curl -X GET {url}/health</pre>
    </div>

    <h2>Available Functions</h2>
"#
    );

    for function in CONTEXT_FUNCTIONS {
        let example = escape_html(&function.example_params().to_string());
        html.push_str(&format!(
            r#"    <div class="endpoint">
        <h3>{fn_name}</h3>
        <p class="description">{description}</p>
        <pre>curl -X POST {url}/proxy/{fn_name} \
    -H "Content-Type: application/json" \
    -d '{example}'</pre>
    </div>
"#,
            fn_name = function.name,
            description = escape_html(function.description),
        ));
    }

    html.push_str("</body>\n</html>\n");
    html
}

/// Escapes text for use in HTML element content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            c => escaped.push(c),
        }
    }
    escaped
}
