//! JavaScript evaluated inside the workspace client
//!
//! Selectors here describe the search result DOM of the web client. They are
//! kept in one place because they are the part most likely to drift.

/// Reads one `.c-search_message` element into the `RenderedMessage` shape
const READ_MESSAGE_FN: &str = r#"
    const readMessage = (msg) => {
        const content = msg.querySelector('.c-search_message__content') || msg;
        const link = msg.querySelector('a.c-timestamp');
        const time = msg.querySelector('time');
        const sender = msg.querySelector('.c-message__sender_button, [data-qa="message_sender_name"]');
        const group = msg.closest('.c-message_group, .c-search_message_group, [role="listitem"]') || msg;
        const channel = group.querySelector('.c-channel_entity__name, [data-qa="search_result_channel_name"]');
        const body = content.querySelector('.c-message__message_blocks, .p-rich_text_block, .c-message__body');
        const more = msg.querySelector(
            '.c-search_message__show_more, [data-qa="message_show_more"], .c-message__body--truncated button'
        );
        return {
            ts: (link && link.getAttribute('data-ts')) || (time && time.getAttribute('data-ts')) || null,
            datetime: (time && time.getAttribute('datetime')) || null,
            permalink: (link && link.href) || null,
            sender: sender ? sender.textContent.trim() : null,
            channel: channel ? channel.textContent.trim() : null,
            body_html: body ? body.innerHTML : '',
            truncated: !!more
        };
    };
    const findMessage = (ts, permalink) => Array.from(document.querySelectorAll('.c-search_message'))
        .find((m) => {
            const l = m.querySelector('a.c-timestamp');
            if (!l) return false;
            return (permalink && l.href === permalink) || (ts && l.getAttribute('data-ts') === ts);
        });
"#;

const COLLECT_BODY: &str = r#"
    return Array.from(document.querySelectorAll('.c-search_message')).map(readMessage);
"#;

/// Scroll the result list back to the top before a scan
pub const SCROLL_TO_TOP_SCRIPT: &str = r#"
    (() => {
        const list = document.querySelector(
            '[data-qa="search_results"] .c-scrollbar__hider, .c-search__results .c-scrollbar__hider'
        ) || document.scrollingElement;
        list.scrollTop = 0;
        return true;
    })()
"#;

/// Scroll the result list by most of a viewport; true when it moved
pub const SCROLL_STEP_SCRIPT: &str = r#"
    (() => {
        const list = document.querySelector(
            '[data-qa="search_results"] .c-scrollbar__hider, .c-search__results .c-scrollbar__hider'
        ) || document.scrollingElement;
        const before = list.scrollTop;
        list.scrollTop = before + Math.max(list.clientHeight * 0.8, 200);
        return list.scrollTop > before;
    })()
"#;

/// True once results or an empty state are shown and nothing is loading
pub const RESULTS_SETTLED_SCRIPT: &str = r#"
    (() => {
        const loading = document.querySelector(
            '[data-qa="search_results_loading"], .c-search__loading, [data-qa="loading_spinner"], .p-search_results__loading'
        );
        if (loading) return false;
        const hasResults = !!document.querySelector('.c-search_message__content');
        const isEmpty = !!document.querySelector(
            '[data-qa="search_results_empty"], .c-search__empty, .p-search_empty_state'
        );
        return hasResults || isEmpty;
    })()
"#;

/// Number of the page the pager marks as current, `null` without a pager
pub const ACTIVE_PAGE_SCRIPT: &str = r#"
    (() => {
        const current = document.querySelector(
            '[data-qa="search_pagination"] [aria-current="page"], .c-pagination [aria-current="page"], .c-pagination__page--selected, .c-search__pager [aria-current="page"]'
        );
        if (!current) return null;
        const n = parseInt((current.getAttribute('aria-label') || current.textContent || '').replace(/\D+/g, ''), 10);
        return Number.isFinite(n) ? n : null;
    })()
"#;

/// Cookies are read through CDP; local storage needs the page context
pub const CAPTURE_LOCAL_STORAGE_SCRIPT: &str = r#"
    (() => {
        try {
            const entries = {};
            for (let i = 0; i < localStorage.length; i++) {
                const key = localStorage.key(i);
                entries[key] = localStorage.getItem(key);
            }
            return { origin: location.origin, local_storage: entries };
        } catch (e) {
            return { origin: location.origin, local_storage: {} };
        }
    })()
"#;

#[must_use]
pub fn collect_messages_script() -> String {
    format!("(() => {{\n{READ_MESSAGE_FN}\n{COLLECT_BODY}\n}})()")
}

/// Click the "show more" affordance of the message identified by `ts`/`permalink`
#[must_use]
pub fn expand_message_script(ts: Option<&str>, permalink: Option<&str>) -> String {
    let ts = serde_json::to_string(&ts).unwrap_or_else(|_| "null".to_string());
    let permalink = serde_json::to_string(&permalink).unwrap_or_else(|_| "null".to_string());
    format!(
        r#"(() => {{
{READ_MESSAGE_FN}
    const msg = findMessage({ts}, {permalink});
    if (!msg) return false;
    msg.scrollIntoView({{ block: 'center' }});
    const more = msg.querySelector(
        '.c-search_message__show_more, [data-qa="message_show_more"], .c-message__body--truncated button'
    );
    if (!more) return false;
    more.click();
    return true;
}})()"#
    )
}

/// True when the message identified by `ts`/`permalink` is in the DOM
#[must_use]
pub fn message_present_script(ts: Option<&str>, permalink: Option<&str>) -> String {
    let ts = serde_json::to_string(&ts).unwrap_or_else(|_| "null".to_string());
    let permalink = serde_json::to_string(&permalink).unwrap_or_else(|_| "null".to_string());
    format!(
        r#"(() => {{
{READ_MESSAGE_FN}
    return !!findMessage({ts}, {permalink});
}})()"#
    )
}

/// Re-read the message identified by `ts`/`permalink`, `null` if gone
#[must_use]
pub fn read_message_script(ts: Option<&str>, permalink: Option<&str>) -> String {
    let ts = serde_json::to_string(&ts).unwrap_or_else(|_| "null".to_string());
    let permalink = serde_json::to_string(&permalink).unwrap_or_else(|_| "null".to_string());
    format!(
        r#"(() => {{
{READ_MESSAGE_FN}
    const msg = findMessage({ts}, {permalink});
    return msg ? readMessage(msg) : null;
}})()"#
    )
}

/// Seed local storage for matching origins on every new document
#[must_use]
pub fn restore_local_storage_script(origins_json: &str) -> String {
    format!(
        r#"(() => {{
    const origins = {origins_json};
    const entry = origins.find((o) => o.origin === location.origin);
    if (!entry) return;
    try {{
        for (const [key, value] of Object.entries(entry.local_storage)) {{
            if (localStorage.getItem(key) === null) localStorage.setItem(key, value);
        }}
    }} catch (e) {{}}
}})()"#
    )
}
