//! Ranked selectors for the workspace web client
//!
//! Each control is described by several candidates tried in order. The first
//! entry is the most specific current selector; later ones survive relabels.

use crate::surface::ControlMatcher;

/// Present only once the client finished loading a signed-in workspace
pub const SIGNED_IN_MARKER: &str = r#"[data-qa="top_nav_search"]"#;

/// Any of these means the browser is looking at a sign-in form
pub const LOGIN_FORM_SELECTORS: &[&str] = &[
    r#"[data-qa="signin_domain_input"]"#,
    r#"[data-qa="login_email"]"#,
    r#"input[type="password"]"#,
];

/// URL fragments of the sign-in flow
pub const LOGIN_URL_MARKERS: &[&str] = &["/signin", "sign_in", "/login", "/get-started"];

pub const SEARCH_INPUT_SELECTORS: &[&str] = &[
    r#"[data-qa="focusable_search_input"] [contenteditable="true"]"#,
    r#"[role="combobox"][contenteditable="true"]"#,
    r#".c-search_autocomplete [contenteditable="true"]"#,
    r#"input[type="search"]"#,
];

/// Where the client echoes the query it actually ran
pub const EFFECTIVE_QUERY_SELECTORS: &[&str] = &[
    r#"[data-qa="top_nav_search"] .p-top_nav__search__text"#,
    r#"[data-qa="search_input_text"]"#,
    ".p-search_filter__query",
];

pub const RESULT_COUNT_SELECTORS: &[&str] = &[
    r#"[data-qa="search_result_header"] [data-qa="search_result_count"]"#,
    r#"[data-qa="search_result_count"]"#,
    ".p-search_results__count",
];

/// Text of the control showing the active sort order
pub const SORT_LABEL_SELECTORS: &[&str] = &[
    r#"[data-qa="search_sort_button"]"#,
    ".p-search_filter__sort button",
];

#[must_use]
pub fn search_open_matchers() -> Vec<ControlMatcher> {
    vec![
        ControlMatcher::css(SIGNED_IN_MARKER),
        ControlMatcher::css(r#"button[aria-label^="Search"]"#),
        ControlMatcher::text_contains("button", "Search"),
    ]
}

#[must_use]
pub fn search_input_matchers() -> Vec<ControlMatcher> {
    SEARCH_INPUT_SELECTORS
        .iter()
        .copied()
        .map(ControlMatcher::css)
        .collect()
}

/// Controls that open the sort menu
#[must_use]
pub fn sort_menu_matchers() -> Vec<ControlMatcher> {
    vec![
        ControlMatcher::css(r#"[data-qa="search_sort_button"]"#),
        ControlMatcher::text_contains("button", "Most relevant"),
        ControlMatcher::text_contains("button", "Sort"),
    ]
}

/// Menu entries selecting oldest-first ordering
#[must_use]
pub fn sort_option_matchers() -> Vec<ControlMatcher> {
    vec![
        ControlMatcher::css(r#"[data-qa="search_sort_oldest"]"#),
        ControlMatcher::text(r#"[role="menuitem"], [role="option"]"#, "Oldest"),
        ControlMatcher::text_contains(r#"[role="menuitem"], [role="option"]"#, "Oldest"),
    ]
}

/// Controls leading to result page `page`
///
/// Numbered buttons come first; the generic "next" buttons are only a
/// fallback since they cannot tell page `n` from page `n + 1`.
#[must_use]
pub fn page_control_matchers(page: u32) -> Vec<ControlMatcher> {
    vec![
        ControlMatcher::css(format!(r#"[aria-label="Page {page}"]"#)),
        ControlMatcher::text(
            r#".c-pagination__page_btn, [data-qa^="c-pagination_page"]"#,
            page.to_string(),
        ),
        ControlMatcher::css(r#"[aria-label="Next page"]"#),
        ControlMatcher::css(r#"[data-qa="pagination_next"]"#),
    ]
}
