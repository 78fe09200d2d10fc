//! Seating fragment parsing.
//!
//! The seating proxy renders a server-side HTML fragment whose `<span>`
//! elements alternate label/value: the span at each even position holds a
//! label with a trailing punctuation character, the following span holds
//! its value. No assumption is made about which labels appear; callers
//! check for the keys they need.

use std::collections::HashMap;

use common::Error;
use quick_xml::events::Event;
use quick_xml::Reader;

/// Parse the proxy fragment into a label → value mapping.
pub fn parse_seating_spans(html: &str) -> Result<HashMap<String, String>, Error> {
    let texts = collect_span_texts(html)?;

    let mut info = HashMap::new();
    for pair in texts.chunks(2) {
        if let [label, value] = pair {
            let mut key = label.clone();
            // The rendered label carries a trailing ":".
            key.pop();
            info.insert(key, value.clone());
        }
    }
    Ok(info)
}

/// Inner text of every `<span>` in document order.
fn collect_span_texts(html: &str) -> Result<Vec<String>, Error> {
    let mut reader = Reader::from_str(html);
    // Server-rendered markup is not guaranteed to be well-formed XML.
    reader.config_mut().check_end_names = false;

    let mut texts = Vec::new();
    let mut span_depth = 0usize;
    let mut current = String::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"span" => {
                if span_depth == 0 {
                    current.clear();
                }
                span_depth += 1;
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"span" => {
                if span_depth > 0 {
                    span_depth -= 1;
                    if span_depth == 0 {
                        texts.push(current.trim().to_string());
                    }
                }
            }
            Ok(Event::Empty(e)) if e.local_name().as_ref() == b"span" => {
                // Self-closing span renders as an empty cell.
                if span_depth == 0 {
                    texts.push(String::new());
                }
            }
            Ok(Event::Text(t)) if span_depth > 0 => {
                // Server fragments carry HTML entities (&nbsp; and friends)
                // the XML unescaper does not know; keep the raw text rather
                // than failing the whole fragment.
                let piece = t
                    .unescape_with(html_entity)
                    .unwrap_or_else(|_| String::from_utf8_lossy(t.as_ref()));
                current.push_str(&piece);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(Error::Markup(e.to_string())),
        }
        buf.clear();
    }

    Ok(texts)
}

/// Entities seen in the rendered fragments beyond the XML five.
fn html_entity(name: &str) -> Option<&'static str> {
    match name {
        "nbsp" => Some("\u{00A0}"),
        _ => None,
    }
}
