//! Wire items and the item builder.
//!
//! A [`WireItem`] is the outward projection of a catalog entry (or a
//! handler-generated message), built fresh for every request because its
//! URLs embed the requesting device and host.

use quick_xml::escape::escape;

use crate::catalog::CatalogEntry;
use crate::context::UrlBuilder;
use crate::utils::encode_id;

/// One `<Item>` of a `ListOfItems` envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireItem {
    /// `ItemType` `Dir`: browsable directory.
    Dir {
        title: String,
        url_dir: String,
    },
    /// `ItemType` `Station`: playable station.
    Station {
        /// URL-safe base64 of the catalog identifier.
        station_id: String,
        name: String,
        /// Playback URL on this server (not the upstream URL).
        url: String,
        description: String,
        format: String,
        bandwidth: String,
        mime: String,
    },
    /// `ItemType` `Message`: informational leaf.
    Message { message: String },
}

impl WireItem {
    /// Builds a message item.
    pub fn message(text: impl Into<String>) -> Self {
        Self::Message {
            message: text.into(),
        }
    }

    /// Converts a catalog entry into a wire item.
    ///
    /// Pure function of its inputs: identical arguments always produce
    /// identical items.
    #[must_use]
    pub fn build(entry: &CatalogEntry, id: &str, urls: &UrlBuilder<'_>) -> Self {
        match entry {
            CatalogEntry::Directory { title } => Self::Dir {
                title: title.clone(),
                url_dir: urls.browse_url(id),
            },
            CatalogEntry::Station(station) => Self::Station {
                station_id: encode_id(id),
                name: station.name.clone(),
                url: urls.playback_url(id),
                description: station.description.clone(),
                format: station.format.clone(),
                bandwidth: station.bandwidth.clone(),
                mime: station.mime.clone(),
            },
        }
    }

    /// `ItemType` tag for this variant.
    #[must_use]
    pub fn item_type(&self) -> &'static str {
        match self {
            Self::Dir { .. } => "Dir",
            Self::Station { .. } => "Station",
            Self::Message { .. } => "Message",
        }
    }

    /// Appends this item's `<Item>` element to `out`.
    pub(crate) fn write_xml(&self, out: &mut String) {
        out.push_str("<Item>");
        push_element(out, "ItemType", self.item_type());
        match self {
            Self::Dir { title, url_dir } => {
                push_element(out, "Title", title);
                push_element(out, "UrlDir", url_dir);
            }
            Self::Station {
                station_id,
                name,
                url,
                description,
                format,
                bandwidth,
                mime,
            } => {
                push_element(out, "StationId", station_id);
                push_element(out, "StationName", name);
                push_element(out, "StationUrl", url);
                push_element(out, "StationDesc", description);
                push_element(out, "StationFormat", format);
                push_element(out, "StationBandWidth", bandwidth);
                push_element(out, "StationMime", mime);
            }
            Self::Message { message } => {
                push_element(out, "Message", message);
            }
        }
        out.push_str("</Item>");
    }
}

/// Appends `<tag>escaped text</tag>`.
pub(crate) fn push_element(out: &mut String, tag: &str, text: &str) {
    out.push('<');
    out.push_str(tag);
    out.push('>');
    out.push_str(&escape(text));
    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}
