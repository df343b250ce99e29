use crate::types::HttpResponse;

/// Serialize an [`HttpResponse`] to a JSON string.
///
/// When `pretty` is `true` the output is indented for readability.
pub fn format_json(response: &HttpResponse, pretty: bool) -> String {
    let result = if pretty {
        serde_json::to_string_pretty(response)
    } else {
        serde_json::to_string(response)
    };
    result.unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
}

/// Render an [`HttpResponse`] in a human-readable debug format.
pub fn format_debug(response: &HttpResponse) -> String {
    let mut out = String::with_capacity(256 + response.body.len());

    out.push_str("=== HTTP Response ===\n");
    out.push_str(&format!("Status:  {}\n", response.status_code));
    out.push_str(&format!("Reason:  {}\n", response.status_text));

    out.push_str(&format!("\n--- Headers ({}) ---\n", response.headers.len()));
    for header in &response.headers {
        out.push_str(&format!("  {}: {}\n", header.name, header.value));
    }

    if response.body.is_empty() {
        out.push_str("\n--- Empty Body ---\n");
    } else {
        out.push_str(&format!("\n--- Body ({} bytes) ---\n", response.body.len()));
        match response.body_as_str() {
            Some(s) => out.push_str(s),
            None => out.push_str(&format!("<binary data: {} bytes>", response.body.len())),
        }
        out.push('\n');
    }

    out.push_str("=====================\n");
    out
}

/// Render only the status line and headers (no body).
pub fn format_headers_only(response: &HttpResponse) -> String {
    let mut out = String::with_capacity(64 + response.headers.len() * 40);

    out.push_str(&format!(
        "HTTP/1.1 {} {}\n",
        response.status_code, response.status_text
    ));

    for header in &response.headers {
        out.push_str(&format!("{}: {}\n", header.name, header.value));
    }

    out
}
