//! HTML diagnostics pages.

use std::fmt::Write;

use html_escape::encode_text;

use crate::services::playback_session_store::StoreSnapshot;

/// Liveness page served at `/health`.
pub const HEALTH_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Noxon health check</title>
</head>
<body>
    <h2>Ok</h2>
</body>
</html>
"#;

/// Renders the status page for a store snapshot taken at `now_millis`.
///
/// Sessions appear most recent first and history sorted by URL, in the
/// order the snapshot already provides.
pub fn render_status_page(snapshot: &StoreSnapshot, now_millis: u64) -> String {
    let mut page = String::from(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n    <meta charset=\"utf-8\">\n    \
         <title>Noxon status</title>\n</head>\n<body>\n",
    );

    let _ = writeln!(
        page,
        "<h2>Active playback ({})</h2>",
        snapshot.sessions.len()
    );
    if snapshot.sessions.is_empty() {
        page.push_str("<p>No active playback</p>\n");
    } else {
        page.push_str(
            "<table>\n<tr><th>MAC</th><th>Station</th><th>Stream URL</th><th>Playing for</th></tr>\n",
        );
        for session in &snapshot.sessions {
            let age_secs = now_millis.saturating_sub(session.started_at_millis) / 1000;
            let _ = writeln!(
                page,
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                encode_text(&session.mac),
                encode_text(&session.station_id),
                encode_text(&session.stream_url),
                format_age(age_secs)
            );
        }
        page.push_str("</table>\n");
    }

    let _ = writeln!(page, "<h2>Proxy history ({})</h2>", snapshot.history.len());
    if snapshot.history.is_empty() {
        page.push_str("<p>Nothing proxied yet</p>\n");
    } else {
        page.push_str("<table>\n<tr><th>Stream URL</th><th>Last MAC</th></tr>\n");
        for (url, mac) in &snapshot.history {
            let _ = writeln!(
                page,
                "<tr><td>{}</td><td>{}</td></tr>",
                encode_text(url),
                encode_text(mac)
            );
        }
        page.push_str("</table>\n");
    }

    page.push_str("</body>\n</html>\n");
    page
}

/// Formats seconds as `1h 02m 03s`, dropping leading zero units.
fn format_age(secs: u64) -> String {
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{h}h {m:02}m {s:02}s")
    } else if m > 0 {
        format!("{m}m {s:02}s")
    } else {
        format!("{s}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::playback_session_store::PlaybackSessionStore;

    #[test]
    fn renders_sessions_in_snapshot_order_and_escapes() {
        let store = PlaybackSessionStore::new();
        store.begin_session("AA", "1", "http://a.example/?x=1&y=<2>", 1_000);
        store.begin_session("BB", "2", "http://b.example/", 61_000);

        let page = render_status_page(&store.snapshot(), 3_724_000);
        let bb = page.find("<td>BB</td>").unwrap();
        let aa = page.find("<td>AA</td>").unwrap();
        assert!(bb < aa);
        assert!(page.contains("http://a.example/?x=1&amp;y=&lt;2&gt;"));
        assert!(page.contains("<td>1h 02m 03s</td>"));
        assert!(page.contains("Active playback (2)"));
    }

    #[test]
    fn renders_empty_state() {
        let page = render_status_page(&StoreSnapshot::default(), 0);
        assert!(page.contains("No active playback"));
        assert!(page.contains("Nothing proxied yet"));
    }

    #[test]
    fn age_formatting() {
        assert_eq!(format_age(0), "0s");
        assert_eq!(format_age(75), "1m 15s");
        assert_eq!(format_age(3600), "1h 00m 00s");
    }
}
