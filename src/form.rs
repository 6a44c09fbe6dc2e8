// ABOUTME: Embedded HTML login form rendered for browser clients
// ABOUTME: Submits username/password and logout=true to the login path
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Authgate Contributors

use std::fmt::Write as _;

/// What the rendered form shows
#[derive(Debug, Default)]
pub struct LoginFormData<'a> {
    pub login_path: &'a str,
    pub authenticated: bool,
    pub failure: bool,
    pub error: bool,
    pub username: &'a str,
}

/// Render the login page.
///
/// The field names (`username`, `password`, `logout`) are part of the wire
/// contract; POST handlers parse exactly these.
#[must_use]
pub fn render(data: &LoginFormData<'_>) -> String {
    let mut page = String::with_capacity(1024);
    let path = escape(data.login_path);

    page.push_str("<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>Login</title></head>\n<body>\n");

    if data.error {
        page.push_str("<div class=\"banner error\">Internal Error. Please try again later.</div>\n");
    }
    if data.failure {
        page.push_str("<div class=\"banner failure\">Wrong credentials</div>\n");
    }

    if data.authenticated {
        let _ = write!(
            page,
            "<p>Welcome {}!</p>\n<form method=\"POST\" action=\"{path}\">\n\
             <input type=\"hidden\" name=\"logout\" value=\"true\">\n\
             <button type=\"submit\">Logout</button>\n</form>\n",
            escape(data.username),
        );
    } else {
        let _ = write!(
            page,
            "<form method=\"POST\" action=\"{path}\">\n\
             <input name=\"username\" placeholder=\"Username\" value=\"{}\">\n\
             <input name=\"password\" type=\"password\" placeholder=\"Password\">\n\
             <button type=\"submit\">Login</button>\n</form>\n",
            escape(data.username),
        );
    }

    page.push_str("</body>\n</html>\n");
    page
}

fn escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_form_posts_the_contract_fields() {
        let page = render(&LoginFormData {
            login_path: "/login",
            ..LoginFormData::default()
        });
        assert!(page.contains("action=\"/login\""));
        assert!(page.contains("name=\"username\""));
        assert!(page.contains("name=\"password\""));
        assert!(!page.contains("logout"));
    }

    #[test]
    fn authenticated_view_offers_logout() {
        let page = render(&LoginFormData {
            login_path: "/login",
            authenticated: true,
            username: "alice",
            ..LoginFormData::default()
        });
        assert!(page.contains("Welcome alice!"));
        assert!(page.contains("name=\"logout\" value=\"true\""));
    }

    #[test]
    fn username_is_html_escaped() {
        let page = render(&LoginFormData {
            login_path: "/login",
            username: "<script>alert(1)</script>",
            ..LoginFormData::default()
        });
        assert!(!page.contains("<script>"));
        assert!(page.contains("&lt;script&gt;"));
    }

    #[test]
    fn banners_reflect_failure_and_error() {
        let failure = render(&LoginFormData {
            login_path: "/login",
            failure: true,
            ..LoginFormData::default()
        });
        assert!(failure.contains("Wrong credentials"));

        let error = render(&LoginFormData {
            login_path: "/login",
            error: true,
            ..LoginFormData::default()
        });
        assert!(error.contains("Internal Error"));
    }
}
