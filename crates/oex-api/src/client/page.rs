use maud::{DOCTYPE, Markup, html};
use reqwest::StatusCode;

fn layout(title: &str, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                title { (title) }
            }
            body {
                h1 { (title) }
                (content)
            }
        }
    }
}

/// Page showing the protected resource's answer
///
/// The body is shown exactly as received; maud escapes it so it renders as
/// text instead of being interpreted as markup.
pub fn resource_page(status: StatusCode, body: &str) -> Markup {
    layout(
        "Protected resource",
        html! {
            p { "Resource responded with " code { (status) } }
            pre { (body) }
        },
    )
}

/// Plain text shown when the authorization server redirects back with an error
pub fn protocol_error_text(error: &str, description: Option<&str>) -> String {
    match description {
        Some(description) => format!("{error}: {description}"),
        None => error.to_string(),
    }
}
