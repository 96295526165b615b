use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use thiserror::Error;

use crate::tree::XmlNode;

/// Errors that can occur while serializing an [`XmlNode`] subtree.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("failed to write XML: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("serialized XML is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Serialize a subtree to an indented XML string.
///
/// Re-parsing the output with [`crate::parse`] yields an equal tree, apart
/// from text that was only whitespace.
pub fn to_xml_string(node: &XmlNode) -> Result<String, WriteError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    write_element(&mut writer, node)?;
    Ok(String::from_utf8(writer.into_inner())?)
}

fn write_element(writer: &mut Writer<Vec<u8>>, node: &XmlNode) -> Result<(), quick_xml::Error> {
    let start = BytesStart::new(node.tag.as_str()).with_attributes(
        node.attributes
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str())),
    );

    if node.children.is_empty() && node.text.is_none() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    if let Some(text) = node.text.as_deref() {
        writer.write_event(Event::Text(BytesText::new(text)))?;
    }
    for child in &node.children {
        write_element(writer, child)?;
    }
    writer.write_event(Event::End(BytesEnd::new(node.tag.as_str())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::to_xml_string;
    use crate::parse;

    #[test]
    fn subtree_round_trips_through_string() {
        let root = parse(
            br#"<Configuration><IPHost transactionid="3"><Name>A &amp; B</Name><HostType>IP</HostType><Empty/></IPHost></Configuration>"#,
        )
        .expect("parse");
        let host = &root.children[0];

        let raw = to_xml_string(host).expect("write");
        assert!(raw.starts_with("<IPHost transactionid=\"3\">"));
        assert!(raw.contains("A &amp; B"));
        assert!(raw.contains("<Empty/>"));

        let reparsed = parse(raw.as_bytes()).expect("reparse");
        assert_eq!(&reparsed, host);
    }

    #[test]
    fn attribute_values_are_escaped() {
        let root = parse(br#"<Zone note="a &lt; b"><Name>LAN</Name></Zone>"#).expect("parse");

        let raw = to_xml_string(&root).expect("write");
        assert!(raw.contains(r#"note="a &lt; b""#));
        assert_eq!(parse(raw.as_bytes()).expect("reparse"), root);
    }
}
