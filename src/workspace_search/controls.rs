//! Ranked control lookup on top of `WorkspaceSurface`

use tracing::{debug, trace};

use super::selectors::{LOGIN_FORM_SELECTORS, LOGIN_URL_MARKERS};
use crate::surface::{ControlMatcher, WorkspaceSurface};

/// Activate the first control any of `matchers` finds
///
/// Returns the index of the matcher that succeeded, `None` when no candidate
/// matched.
pub async fn activate_first<S: WorkspaceSurface>(
    surface: &S,
    matchers: &[ControlMatcher],
) -> anyhow::Result<Option<usize>> {
    for (index, matcher) in matchers.iter().enumerate() {
        if surface.activate(matcher).await? {
            debug!("Activated control via {:?}", matcher);
            return Ok(Some(index));
        }
        trace!("No control for {:?}", matcher);
    }
    Ok(None)
}

/// Text of the first selector that yields any
pub async fn read_first_text<S: WorkspaceSurface>(surface: &S, selectors: &[&str]) -> Option<String> {
    for selector in selectors {
        if let Some(text) = surface.read_text(selector).await {
            return Some(text);
        }
    }
    None
}

/// Whether the browser was sent to the sign-in flow
pub async fn is_login_redirect<S: WorkspaceSurface>(surface: &S) -> bool {
    let url = surface.current_url().await.to_lowercase();
    if LOGIN_URL_MARKERS.iter().any(|marker| url.contains(marker)) {
        return true;
    }
    for selector in LOGIN_FORM_SELECTORS {
        if surface.is_present(selector).await {
            return true;
        }
    }
    false
}
