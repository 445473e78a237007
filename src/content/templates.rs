//! Derivation of served pages and URL paths from base templates and settings.
//!
//! Everything here is a pure string transformation apart from drawing the
//! random stream-path suffix. Substitutions replace only the first match of
//! each placeholder, and a missing placeholder leaves the template
//! untouched for that substitution rather than failing.

use crate::settings::StreamSettings;
use bytes::Bytes;
use rand::distributions::Alphanumeric;
use rand::Rng;

/// Path of the index (or PIN-entry) page.
pub const DEFAULT_HTML_ADDRESS: &str = "/";
/// Stream path served while the PIN gate is off.
pub const DEFAULT_STREAM_ADDRESS: &str = "/screen-stream.mjpeg";
/// Prefix of the PIN submission path; the accepted path appends the PIN.
pub const DEFAULT_PIN_ADDRESS: &str = "/?pin=";
/// Favicon path.
pub const FAVICON_ADDRESS: &str = "/favicon.ico";
/// Logo image path.
pub const LOGO_ADDRESS: &str = "/logo.png";

/// Locale placeholder for the PIN prompt, resolved once at init.
pub const ENTER_PIN_TOKEN: &str = "ENTER_PIN";
/// Locale placeholder for the PIN submit button, resolved once at init.
pub const SUBMIT_TEXT_TOKEN: &str = "SUBMIT_TEXT";

const BACKGROUND_COLOR_TOKEN: &str = "BACKGROUND_COLOR";
const STREAM_ADDRESS_TOKEN: &str = "SCREEN_STREAM_ADDRESS";
const WRONG_PIN_TOKEN: &str = "WRONG_PIN_MESSAGE";

// Marker attributes carrying the client-side MJPEG capability check.
// Stripped verbatim, leading space included, when the check is disabled.
const MJPEG_CHECK_ONLOAD: &str = " onload=\"mjpegCheck(this);\"";
const MJPEG_CHECK_ONERROR: &str = " onerror=\"mjpegFallback(this);\"";

const BLANK_MARKER: &str = "&nbsp;";
const STREAM_PATH_LEN: usize = 16;

/// Everything the running listener serves, captured at one `configure`.
///
/// The listener holds its own copy; a later `configure` produces a new
/// value that only takes effect on the next start.
#[derive(Debug, Clone)]
pub struct ServedContent {
    /// Final index page HTML.
    pub index_html: String,
    /// Path of the MJPEG stream. Randomized while the PIN gate is on.
    pub stream_path: String,
    /// Path that unlocks the index page while the PIN gate is on.
    pub pin_path: String,
    /// Whether the PIN gate is active.
    pub pin_enabled: bool,
    /// PIN-entry page; empty while the PIN gate is off.
    pub pin_entry_html: String,
    /// PIN-error page; empty while the PIN gate is off.
    pub pin_error_html: String,
    /// Favicon bytes served verbatim.
    pub favicon: Bytes,
    /// Logo bytes served verbatim.
    pub logo: Bytes,
}

impl ServedContent {
    /// Derive the full set of served artifacts from base templates and
    /// the given settings.
    pub fn derive(
        base_index: &str,
        base_pin: &str,
        wrong_pin_text: &str,
        favicon: Bytes,
        logo: Bytes,
        settings: &StreamSettings,
    ) -> Self {
        let stream_path = if settings.pin_enabled {
            random_stream_path()
        } else {
            DEFAULT_STREAM_ADDRESS.to_string()
        };
        let pin_path = if settings.pin_enabled {
            format!("{}{}", DEFAULT_PIN_ADDRESS, settings.pin)
        } else {
            DEFAULT_PIN_ADDRESS.to_string()
        };
        let (pin_entry_html, pin_error_html) = if settings.pin_enabled {
            (
                pin_page(base_pin, BLANK_MARKER),
                pin_page(base_pin, wrong_pin_text),
            )
        } else {
            (String::new(), String::new())
        };

        Self {
            index_html: index_html(base_index, settings, &stream_path),
            stream_path,
            pin_path,
            pin_enabled: settings.pin_enabled,
            pin_entry_html,
            pin_error_html,
            favicon,
            logo,
        }
    }
}

/// Build the final index page: background color, optional MJPEG-check
/// strip, then the stream address.
fn index_html(base: &str, settings: &StreamSettings, stream_path: &str) -> String {
    let color = format!("#{:06X}", settings.background_color & 0x00FF_FFFF);
    let mut html = base.replacen(BACKGROUND_COLOR_TOKEN, &color, 1);
    if settings.disable_mjpeg_check {
        html = html.replacen(MJPEG_CHECK_ONLOAD, "", 1);
        html = html.replacen(MJPEG_CHECK_ONERROR, "", 1);
    }
    html.replacen(STREAM_ADDRESS_TOKEN, stream_path, 1)
}

/// Build a PIN page by filling the wrong-PIN slot with the given message.
fn pin_page(base: &str, message: &str) -> String {
    base.replacen(WRONG_PIN_TOKEN, message, 1)
}

/// Random `/<16 alphanumeric chars>.mjpeg` path.
///
/// Not a secret: the PIN is the gate, the random path only keeps the
/// stream URL unguessable enough that clients go through the index page.
fn random_stream_path() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(STREAM_PATH_LEN)
        .map(char::from)
        .collect();
    format!("/{}.mjpeg", suffix)
}
