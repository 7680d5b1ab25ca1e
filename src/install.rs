//! Install redirects and link sanitizing for the app detail view.

use url::Url;

use crate::descriptor::{AppType, Descriptor};

/// URL scheme handled by the desktop app.
pub const INSTALL_SCHEME: &str = "hanzo";

/// Build the `hanzo://install/...` URL that asks the desktop app to install `app`.
///
/// The wallet address is appended only when a wallet is connected.
pub fn install_url(app: &Descriptor, wallet: Option<&str>) -> String {
    let mut url = format!(
        "{INSTALL_SCHEME}://install/{}?name={}&type={}",
        urlencoding::encode(app.id().unwrap_or_default()),
        urlencoding::encode(app.name().unwrap_or_default()),
        urlencoding::encode(
            app.type_field()
                .filter(|ty| !ty.is_empty())
                .unwrap_or(AppType::Tool.as_str())
        ),
    );

    if let Some(address) = wallet.filter(|a| !a.is_empty()) {
        url.push_str("&wallet=");
        url.push_str(&urlencoding::encode(address));
    }

    url
}

/// Validate a link for display.
///
/// Values without a scheme get `https://`. Only http and https are allowed.
pub fn sanitize_url(value: &str) -> Option<String> {
    if value.is_empty() {
        return None;
    }

    let candidate = if value.starts_with("http") {
        value.to_string()
    } else {
        format!("https://{value}")
    };

    let parsed = Url::parse(&candidate).ok()?;
    match parsed.scheme() {
        "http" | "https" => Some(parsed.to_string()),
        _ => None,
    }
}
