use thiserror::Error;

use crate::ema::{lookup, EmaId, EmaItem, EmaTables, DEFAULT_LICENSE, OTHER_LICENSE, YT_STANDARD_LICENSE, YT_TERMS_URL};
use crate::khan::TopicNode;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MappingError {
    #[error("item {id} has no {field}")]
    MissingField { id: String, field: &'static str },
    #[error("item {id} has unknown license `{license}`")]
    UnknownLicense { id: String, license: String },
}

/// Source-neutral view of a content item before it is mapped to EMA.
#[derive(Debug, Clone, Default)]
pub struct SourceItem {
    pub id: Option<EmaId>,
    pub url: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub creation_date: Option<String>,
    pub license: Option<String>,
}

/// Course (or schema) level keys shared by every item of one export.
#[derive(Debug, Clone, Copy)]
pub struct ItemContext<'a> {
    pub course: &'a str,
    pub subject: &'a str,
    pub content_type: &'a str,
}

pub fn source_from_topic_node(node: &TopicNode) -> SourceItem {
    SourceItem {
        id: Some(node.id.clone()).filter(|s| !s.is_empty()).map(EmaId::Text),
        url: node.ka_url.clone(),
        title: node.translated_title.clone(),
        description: node.translated_description.clone(),
        creation_date: node.creation_date.clone(),
        license: node.ka_user_license.clone(),
    }
}

/// Optional taxonomy fields with no table entry are left out.
pub fn ema_item_from_source(tables: &EmaTables, ctx: &ItemContext<'_>, src: SourceItem) -> Result<EmaItem, MappingError> {
    let id = src.id.ok_or_else(|| MappingError::MissingField { id: "?".into(), field: "id" })?;
    let missing = |field| MappingError::MissingField { id: id.to_string(), field };
    let url = src.url.ok_or_else(|| missing("url"))?;
    let nazev = src.title.ok_or_else(|| missing("title"))?;
    let popis = src.description.ok_or_else(|| missing("description"))?;

    let license_key = src.license.as_deref().unwrap_or(DEFAULT_LICENSE);
    let mut licence = Some(lookup(tables.licence, license_key).ok_or_else(|| MappingError::UnknownLicense {
        id: id.to_string(),
        license: license_key.to_string(),
    })?);
    let mut licence_url = None;
    if licence == Some(OTHER_LICENSE) {
        if license_key == YT_STANDARD_LICENSE {
            licence_url = Some(YT_TERMS_URL);
        } else {
            tracing::warn!(%id, "missing license URL, dropping licence");
            licence = None;
        }
    }

    Ok(EmaItem {
        id,
        url,
        nazev,
        popis,
        autor: tables.autor,
        jazyk: tables.jazyk,
        dostupnost: tables.dostupnost,
        licence,
        licence_url,
        typ: lookup(tables.typ, ctx.content_type),
        stupen_vzdelavani: lookup(tables.stupen_vzdelavani, ctx.course),
        vzdelavaci_obor: lookup(tables.vzdelavaci_obor, ctx.subject),
        gramotnost: lookup(tables.gramotnost, ctx.subject),
        rocnik: lookup(tables.rocnik, ctx.course).filter(|r| !r.is_empty()),
        datum_vzniku: src.creation_date,
    })
}
