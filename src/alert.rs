//! Alert system for displaying error messages to users.
//!
//! Alerts are rendered as an out-of-band swap of the page's alert container,
//! so any htmx request can surface one regardless of its target.

use axum::response::{Html, IntoResponse, Response};
use maud::{Markup, html};

/// A message to show the user in the alert container.
#[derive(Debug, Clone, PartialEq)]
pub enum Alert {
    /// Something failed, with an explanation of what to do about it.
    Error { message: String, details: String },
    /// Something failed and there is nothing more to say about it.
    ErrorSimple { message: String },
}

const ALERT_ERROR_STYLE: &str = "flex items-start justify-between gap-4 p-4 rounded-lg \
    shadow-lg text-red-800 bg-red-50 border border-red-300 \
    dark:bg-gray-800 dark:text-red-400 dark:border-red-800";

impl Alert {
    /// Render the alert as the contents of `#alert-container`.
    pub fn into_markup(self) -> Markup {
        let (message, details) = match self {
            Alert::Error { message, details } => (message, details),
            Alert::ErrorSimple { message } => (message, String::new()),
        };

        html! {
            div
                id="alert-container"
                hx-swap-oob="true"
                class="w-full max-w-md px-4"
                style="position: fixed; bottom: 1rem; left: 50%; transform: translateX(-50%); z-index: 9999;"
            {
                div role="alert" class=(ALERT_ERROR_STYLE)
                {
                    div
                    {
                        p class="text-sm font-medium" { (message) }

                        @if !details.is_empty() {
                            p class="mt-1 text-sm opacity-80" { (details) }
                        }
                    }

                    button
                        type="button"
                        aria-label="Dismiss"
                        class="text-sm font-semibold opacity-70 hover:opacity-100"
                        onclick="this.closest('#alert-container').replaceChildren()"
                    {
                        "✕"
                    }
                }
            }
        }
    }

    /// Render the alert as an HTML fragment.
    pub fn into_html(self) -> Html<String> {
        Html(self.into_markup().into_string())
    }
}

impl IntoResponse for Alert {
    fn into_response(self) -> Response {
        self.into_html().into_response()
    }
}

#[cfg(test)]
mod alert_tests {
    use scraper::{Html, Selector};

    use super::Alert;

    #[test]
    fn renders_message_and_details() {
        let html = Alert::Error {
            message: "Failed to parse CSV".to_owned(),
            details: "Line 3 has too many fields.".to_owned(),
        }
        .into_html()
        .0;
        let fragment = Html::parse_fragment(&html);

        let message = fragment
            .select(&Selector::parse("#alert-container p.text-sm.font-medium").unwrap())
            .next()
            .expect("No alert message found");
        let details = fragment
            .select(&Selector::parse("#alert-container p.mt-1.text-sm.opacity-80").unwrap())
            .next()
            .expect("No alert details found");

        assert_eq!(message.text().collect::<String>(), "Failed to parse CSV");
        assert_eq!(
            details.text().collect::<String>(),
            "Line 3 has too many fields."
        );
    }

    #[test]
    fn simple_error_has_no_details() {
        let html = Alert::ErrorSimple {
            message: "File type must be CSV.".to_owned(),
        }
        .into_html()
        .0;
        let fragment = Html::parse_fragment(&html);

        let details = fragment
            .select(&Selector::parse("p.opacity-80").unwrap())
            .next();

        assert!(details.is_none(), "want no details paragraph, got one");
    }
}
