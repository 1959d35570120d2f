//! Device wire format.
//!
//! Every non-playback response is a `ListOfItems` envelope: an item count
//! (`-1` when not applicable) followed by the items. The exception is the
//! login acknowledgment, which is a bare `EncryptedToken` element.

mod items;

pub use items::WireItem;

use axum::http::header;
use axum::response::{IntoResponse, Response};

use crate::protocol_constants::{
    ENVELOPE_CONTENT_TYPE, ITEM_COUNT_NOT_APPLICABLE, LOGIN_TOKEN, XML_DECLARATION,
};
use items::push_element;

/// Response envelope shared by the browse, search and preset handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListOfItems {
    /// Real item count, or `-1` when not applicable.
    pub item_count: i64,
    /// Items in display order.
    pub items: Vec<WireItem>,
}

impl ListOfItems {
    /// Envelope reporting a real count (e.g. children of a directory).
    pub fn counted(item_count: usize, items: Vec<WireItem>) -> Self {
        Self {
            item_count: i64::try_from(item_count).unwrap_or(i64::MAX),
            items,
        }
    }

    /// Envelope for a single item where a count does not apply.
    pub fn single(item: WireItem) -> Self {
        Self {
            item_count: ITEM_COUNT_NOT_APPLICABLE,
            items: vec![item],
        }
    }

    /// Envelope carrying one informational message.
    pub fn message(text: impl Into<String>) -> Self {
        Self::single(WireItem::message(text))
    }

    /// Serializes the envelope including the XML declaration.
    #[must_use]
    pub fn to_xml(&self) -> String {
        let mut out = String::from(XML_DECLARATION);
        out.push_str("<ListOfItems>");
        push_element(&mut out, "ItemCount", &self.item_count.to_string());
        for item in &self.items {
            item.write_xml(&mut out);
        }
        out.push_str("</ListOfItems>");
        out
    }
}

impl IntoResponse for ListOfItems {
    fn into_response(self) -> Response {
        ([(header::CONTENT_TYPE, ENVELOPE_CONTENT_TYPE)], self.to_xml()).into_response()
    }
}

/// Login acknowledgment carrying the fixed token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoginToken;

impl LoginToken {
    /// Serializes the acknowledgment element.
    #[must_use]
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        push_element(&mut out, "EncryptedToken", LOGIN_TOKEN);
        out
    }
}

impl IntoResponse for LoginToken {
    fn into_response(self) -> Response {
        (
            [(header::CONTENT_TYPE, "application/xml; charset=utf-8")],
            self.to_xml(),
        )
            .into_response()
    }
}
