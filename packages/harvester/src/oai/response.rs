//! Parsing of OAI-PMH response documents.
//!
//! Every response is wrapped in an `<OAI-PMH>` envelope holding either an
//! `<error>` element or one element named after the verb.

use roxmltree::{Document, Node};

use crate::config::{parse_datestamp, Granularity};
use crate::error::{HarvesterError, Result};
use crate::record::Record;
use crate::xml::{
    element_children, find_by_path, find_child, find_children, get_text, has_tag,
    serialize_children,
};

/// Error code providers use for an empty result set.
const NO_RECORDS_MATCH: &str = "noRecordsMatch";

/// Parsed `Identify` response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identify {
    pub repository_name: String,
    pub base_url: String,
    pub protocol_version: String,
    pub earliest_datestamp: String,
    pub deleted_record: String,
    pub granularity: Granularity,
}

/// One entry of a `ListMetadataFormats` response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataFormat {
    pub prefix: String,
    pub schema: String,
    pub namespace: String,
}

/// One page of a `ListRecords` response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRecordsPage {
    pub records: Vec<Record>,
    /// Continuation token; `None` (or empty in the XML) on the last page.
    pub resumption_token: Option<String>,
}

/// Parse an `Identify` response.
pub fn parse_identify(xml: &str) -> Result<Identify> {
    let doc = Document::parse(xml)?;
    let identify = verb_element(&doc, "Identify")?;

    let text = |tag: &str| find_child(identify, tag).map(get_text).unwrap_or_default();

    let base_url = text("baseURL");
    if base_url.is_empty() {
        return Err(HarvesterError::MalformedResponse(
            "Identify response has no baseURL".to_string(),
        ));
    }

    Ok(Identify {
        repository_name: text("repositoryName"),
        base_url,
        protocol_version: text("protocolVersion"),
        earliest_datestamp: text("earliestDatestamp"),
        deleted_record: text("deletedRecord"),
        granularity: Granularity::from_identify(&text("granularity")),
    })
}

/// Parse a `ListMetadataFormats` response.
pub fn parse_list_metadata_formats(xml: &str) -> Result<Vec<MetadataFormat>> {
    let doc = Document::parse(xml)?;
    let list = verb_element(&doc, "ListMetadataFormats")?;

    Ok(find_children(list, "metadataFormat")
        .map(|format| {
            let text = |tag: &str| find_child(format, tag).map(get_text).unwrap_or_default();
            MetadataFormat {
                prefix: text("metadataPrefix"),
                schema: text("schema"),
                namespace: text("metadataNamespace"),
            }
        })
        .collect())
}

/// Parse one page of a `ListRecords` response.
pub fn parse_list_records(xml: &str) -> Result<ListRecordsPage> {
    let doc = Document::parse(xml)?;
    let list = verb_element(&doc, "ListRecords")?;

    let records = find_children(list, "record")
        .map(parse_record)
        .collect::<Result<Vec<_>>>()?;

    let resumption_token = find_child(list, "resumptionToken")
        .map(get_text)
        .filter(|token| !token.is_empty());

    Ok(ListRecordsPage {
        records,
        resumption_token,
    })
}

/// Parse a single `<record>` element.
fn parse_record(node: Node<'_, '_>) -> Result<Record> {
    let header = find_child(node, "header")
        .ok_or_else(|| HarvesterError::MalformedResponse("record without header".to_string()))?;

    let identifier = find_child(header, "identifier")
        .map(get_text)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| {
            HarvesterError::MalformedResponse("record header without identifier".to_string())
        })?;

    let datestamp_text = find_child(header, "datestamp")
        .map(get_text)
        .unwrap_or_default();
    let datestamp = parse_datestamp(&datestamp_text).ok_or_else(|| {
        HarvesterError::MalformedResponse(format!(
            "record {identifier} has invalid datestamp '{datestamp_text}'"
        ))
    })?;

    let is_deleted = header.attribute("status") == Some("deleted");

    let set_specs = find_children(header, "setSpec").map(get_text).collect();

    let metadata = if is_deleted {
        None
    } else {
        find_child(node, "metadata").map(serialize_children)
    };

    let about = find_children(node, "about").map(serialize_children).collect();

    Ok(Record {
        identifier,
        is_deleted,
        datestamp,
        set_specs,
        metadata,
        about,
    })
}

/// Validate the envelope and return the element for `verb`.
///
/// An `<error>` element in the envelope is turned into the matching error.
fn verb_element<'a, 'input>(doc: &'a Document<'input>, verb: &str) -> Result<Node<'a, 'input>> {
    let root = doc.root_element();
    if !has_tag(root, "OAI-PMH") {
        return Err(HarvesterError::MalformedResponse(format!(
            "unexpected root element <{}>",
            root.tag_name().name()
        )));
    }

    if let Some(error) = find_child(root, "error") {
        let code = error.attribute("code").unwrap_or_default().to_string();
        if code == NO_RECORDS_MATCH {
            return Err(HarvesterError::NoRecordsMatch);
        }
        return Err(HarvesterError::OaiPmh {
            code,
            message: get_text(error),
        });
    }

    find_by_path(root, verb).ok_or_else(|| {
        let found: Vec<&str> = element_children(root)
            .map(|n| n.tag_name().name())
            .collect();
        HarvesterError::MalformedResponse(format!(
            "missing <{verb}> element (found: {})",
            found.join(", ")
        ))
    })
}
