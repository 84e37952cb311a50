//! Resource manifest canonicalization.
use tracing::warn;

use super::schema::{self, Attr, Audience, KindSchema, SOURCE, Section};
use super::{
    decode_generic, encode_generic, is_leaf_list, leaves, normalize_list, normalize_marker, push,
};
use crate::element::Element;
use crate::error::{ResolveError, Result};
use crate::node::{Mapping, Node};

/// Root element of a resource manifest.
pub const ROOT: &str = "config";

/// Root attribute naming the managed file.
pub const FILENAME_ATTRIBUTE: &str = "filename";

/// Decode a (filtered) element-tree resource manifest.
///
/// Unknown elements are decoded generically unless `strict` is set.
///
/// # Errors
///
/// In strict mode, returns [`ResolveError::InvalidAttribute`] for any element
/// the section tables do not know.
pub fn from_element(root: &Element, strict: bool) -> Result<Mapping> {
    let mut out = Mapping::new();
    for child in &root.children {
        let name = child.name.as_str();
        if schema::is_exec_section(name) {
            decode_exec_section(&mut out, child, strict)?;
            continue;
        }
        match schema::section(name) {
            Some(Section::Marker) => {
                out.insert(name.to_string(), Node::Bool(true));
            }
            Some(Section::Repeated) => push(&mut out, name, Node::from(child.text.as_str())),
            Some(Section::Kind(kind)) => {
                let decoded = decode_kind(kind, child, strict)?;
                match out.get_mut(name) {
                    Some(Node::Map(existing)) => existing.extend(decoded),
                    _ => {
                        out.insert(name.to_string(), Node::Map(decoded));
                    }
                }
            }
            Some(Section::Exec { .. }) | None if strict => {
                return Err(ResolveError::invalid_attribute(
                    ROOT,
                    name,
                    "unknown section",
                ));
            }
            Some(Section::Exec { .. }) | None => {
                out.insert(name.to_string(), decode_generic(child));
            }
        }
    }
    Ok(out)
}

fn decode_exec_section(out: &mut Mapping, section: &Element, strict: bool) -> Result<()> {
    if section.children.is_empty() && !schema::is_shared_section(&section.name) {
        if let Some(key) = schema::exec_key(&section.name, "exec") {
            out.entry(key.to_string())
                .or_insert_with(|| Node::List(Vec::new()));
        }
    }
    for child in &section.children {
        match schema::exec_key(&section.name, &child.name) {
            Some(key) => push(out, key, Node::from(child.text.as_str())),
            None if strict => {
                return Err(ResolveError::invalid_attribute(
                    section.name.as_str(),
                    child.name.as_str(),
                    "not a command element of this section",
                ));
            }
            None => warn!(
                section = %section.name,
                element = %child.name,
                "ignoring unknown command element"
            ),
        }
    }
    Ok(())
}

fn decode_kind(kind: &KindSchema, element: &Element, strict: bool) -> Result<Mapping> {
    let mut attrs = Mapping::new();
    for child in &element.children {
        let name = child.name.as_str();
        if name == SOURCE {
            for source in &child.children {
                if strict && !kind.is_source(&source.name) {
                    return Err(ResolveError::invalid_attribute(
                        kind.name,
                        source.name.as_str(),
                        format!("not a {} source kind", kind.name),
                    ));
                }
                attrs.insert(source.name.clone(), Node::from(source.text.as_str()));
            }
            continue;
        }
        let value = match kind.attribute(name) {
            Some(Attr::Marker) => Node::Bool(true),
            Some(Attr::Text) => Node::from(child.text.as_str()),
            None if kind.is_source(name) => Node::from(child.text.as_str()),
            None if strict => {
                return Err(ResolveError::invalid_attribute(
                    kind.name,
                    name,
                    format!("not a {} attribute", kind.name),
                ));
            }
            None => decode_generic(child),
        };
        attrs.insert(name.to_string(), value);
    }
    Ok(attrs)
}

/// Normalize a (filtered, key-normalized) generic-tree resource manifest.
///
/// List sections given as a scalar become one-element lists, `false` markers
/// are dropped, and a nested `source` mapping is flattened into its kind.
/// Empty `post` lists are dropped. Keys the tables do not know pass through
/// unchanged.
#[must_use]
pub fn normalize(mapping: Mapping) -> Mapping {
    mapping
        .into_iter()
        .filter_map(|(key, value)| {
            let value = match schema::section(&key) {
                Some(Section::Marker) => normalize_marker(value)?,
                Some(Section::Exec { section, .. }) if schema::is_shared_section(section) => {
                    normalize_list(value).filter(|list| !list.as_list().is_some_and(<[Node]>::is_empty))?
                }
                Some(Section::Repeated | Section::Exec { .. }) => normalize_list(value)?,
                Some(Section::Kind(kind)) => normalize_kind(kind, value),
                None => value,
            };
            Some((key, value))
        })
        .collect()
}

fn normalize_kind(kind: &KindSchema, value: Node) -> Node {
    let attrs = match value {
        Node::Null => return Node::Map(Mapping::new()),
        Node::Map(attrs) => attrs,
        other => return other,
    };
    let mut out = Mapping::with_capacity(attrs.len());
    for (key, value) in attrs {
        match value {
            Node::Map(sources) if key == SOURCE => out.extend(sources),
            value if kind.attribute(&key) == Some(Attr::Marker) => {
                if let Some(marker) = normalize_marker(value) {
                    out.insert(key, marker);
                }
            }
            value => {
                out.insert(key, value);
            }
        }
    }
    Node::Map(out)
}

/// Check a canonical resource manifest against the section tables.
///
/// # Errors
///
/// Returns [`ResolveError::InvalidAttribute`] for an unknown section or kind
/// attribute, a marker that is not `true`, a list section holding anything
/// but leaf values, or two different source kinds in one resource.
pub fn validate(mapping: &Mapping) -> Result<()> {
    for (key, value) in mapping {
        match schema::section(key) {
            None => {
                return Err(ResolveError::invalid_attribute(ROOT, key.as_str(), "unknown section"));
            }
            Some(Section::Marker) if !value.is_true() => {
                return Err(ResolveError::invalid_attribute(
                    ROOT,
                    key.as_str(),
                    "a marker can only be true",
                ));
            }
            Some(Section::Repeated | Section::Exec { .. }) if !is_leaf_list(value) => {
                return Err(ResolveError::invalid_attribute(
                    ROOT,
                    key.as_str(),
                    "expected a list of values",
                ));
            }
            Some(Section::Kind(kind)) => validate_kind(kind, value)?,
            Some(_) => {}
        }
    }
    Ok(())
}

fn validate_kind(kind: &KindSchema, value: &Node) -> Result<()> {
    let Some(attrs) = value.as_map() else {
        return Err(ResolveError::invalid_attribute(
            ROOT,
            kind.name,
            "a resource kind must be a mapping",
        ));
    };
    let mut source: Option<&str> = None;
    for (key, value) in attrs {
        let reason = match kind.attribute(key) {
            Some(Attr::Marker) if !value.is_true() => Some("a marker can only be true".to_string()),
            Some(Attr::Text) if value.leaf_text().is_none() => {
                Some("expected a single value".to_string())
            }
            Some(_) => None,
            None if kind.is_source(key) => match source.replace(key) {
                Some(first) => Some(format!("conflicts with source kind '{first}'")),
                None if value.leaf_text().is_none() => Some("expected a single value".to_string()),
                None => None,
            },
            None => Some(format!("not a {} attribute", kind.name)),
        };
        if let Some(reason) = reason {
            return Err(ResolveError::invalid_attribute(kind.name, key.as_str(), reason));
        }
    }
    Ok(())
}

/// Render a canonical resource manifest as an element tree.
///
/// Sections are written in table order whatever the mapping's order; keys
/// the tables do not know are appended generically.
#[must_use]
pub fn to_element(mapping: &Mapping, filename: &str, audience: Audience) -> Element {
    let mut root = Element::new(ROOT).with_attribute(FILENAME_ATTRIBUTE, filename);
    for (key, section) in &schema::SECTIONS {
        let Some(value) = mapping.get(*key) else {
            continue;
        };
        if !audience.receives(key) {
            continue;
        }
        match section {
            Section::Marker => {
                if value.is_true() {
                    root.children.push(Element::new(*key));
                }
            }
            Section::Repeated => {
                for text in leaves(value) {
                    root.children.push(Element::leaf(*key, text));
                }
            }
            Section::Exec { section, child } => {
                if schema::is_shared_section(section) && leaves(value).is_empty() {
                    continue;
                }
                if root.children.last().is_none_or(|last| last.name != *section) {
                    root.children.push(Element::new(*section));
                }
                if let Some(open) = root.children.last_mut() {
                    for text in leaves(value) {
                        open.children.push(Element::leaf(*child, text));
                    }
                }
            }
            Section::Kind(kind) => {
                if let Some(attrs) = value.as_map() {
                    root.children.push(encode_kind(kind, attrs));
                }
            }
        }
    }
    for (key, value) in mapping {
        if schema::section(key).is_none() {
            root.children.extend(encode_generic(key, value));
        }
    }
    root
}

fn encode_kind(kind: &KindSchema, attrs: &Mapping) -> Element {
    let mut element = Element::new(kind.name);
    for (name, attr) in kind.attributes {
        let Some(value) = attrs.get(*name) else {
            continue;
        };
        match attr {
            Attr::Marker => {
                if value.is_true() {
                    element.children.push(Element::new(*name));
                }
            }
            Attr::Text => {
                if let Some(text) = value.leaf_text() {
                    element.children.push(Element::leaf(*name, text));
                }
            }
        }
    }

    let sources: Vec<Element> = kind
        .sources
        .iter()
        .filter_map(|name| {
            let text = attrs.get(*name)?.leaf_text()?;
            Some(Element::leaf(*name, text))
        })
        .collect();
    if kind.wrap_sources && !sources.is_empty() {
        let mut wrapper = Element::new(SOURCE);
        wrapper.children = sources;
        element.children.push(wrapper);
    } else {
        element.children.extend(sources);
    }

    for (key, value) in attrs {
        if !kind.allows(key) {
            element.children.extend(encode_generic(key, value));
        }
    }
    element
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn yaml_map(text: &str) -> Mapping {
        Node::from_yaml_str(text, "test")
            .unwrap()
            .as_map()
            .unwrap()
            .clone()
    }

    fn element(text: &str) -> Element {
        Element::parse(text, "test").unwrap().unwrap()
    }

    #[test]
    fn source_wrapper_is_flattened() {
        let root = element("<config><file><source><plain>plainfile</plain></source></file></config>");
        let decoded = from_element(&root, false).unwrap();
        assert_eq!(decoded, yaml_map("file: {plain: plainfile}"));
    }

    #[test]
    fn duplicate_source_kind_collapses_last_wins() {
        let root = element(
            "<config><file><source><plain>first</plain><plain>second</plain></source></file></config>",
        );
        let decoded = from_element(&root, true).unwrap();
        assert_eq!(decoded, yaml_map("file: {plain: second}"));
    }

    #[test]
    fn empty_post_section_decodes_to_nothing() {
        let decoded = from_element(&element("<config><post/></config>"), true).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn empty_unshared_section_yields_empty_list() {
        let decoded = from_element(&element("<config><setup/></config>"), true).unwrap();
        assert_eq!(decoded, yaml_map("setup: []"));
    }

    #[test]
    fn empty_post_lists_are_dropped_by_normalization() {
        assert!(normalize(yaml_map("post_once: []")).is_empty());
        assert_eq!(
            normalize(yaml_map("post: []\npost_once: x\npost_once_per_run: []\nsetup: []\n")),
            yaml_map("post_once: [x]\nsetup: []")
        );
    }

    #[test]
    fn empty_post_lists_round_trip() {
        let input = yaml_map("post: []\npost_once: [x]\n");
        let encoded = to_element(&input, "f", Audience::Server);
        assert_eq!(
            encoded.to_xml().unwrap(),
            r#"<config filename="f"><post><exec_once>x</exec_once></post></config>"#
        );
        let decoded = from_element(&encoded, true).unwrap();
        assert_eq!(decoded, yaml_map("post_once: [x]"));
        assert_eq!(decoded, normalize(input));

        let all_empty = yaml_map("post: []\npost_once: []\npost_once_per_run: []\n");
        let encoded = to_element(&all_empty, "f", Audience::Server);
        assert!(encoded.children.is_empty());
        assert!(normalize(all_empty).is_empty());
    }

    #[test]
    fn unknown_elements_decode_generically_unless_strict() {
        let root = element("<config><extra><a>1</a></extra></config>");
        assert_eq!(from_element(&root, false).unwrap(), yaml_map("extra: {a: '1'}"));
        assert!(matches!(
            from_element(&root, true),
            Err(ResolveError::InvalidAttribute { key, .. }) if key == "extra"
        ));
    }

    #[test]
    fn unknown_kind_attribute_in_strict_mode() {
        let root = element("<config><link><bogus>x</bogus></link></config>");
        assert!(from_element(&root, false).is_ok());
        assert!(matches!(
            from_element(&root, true),
            Err(ResolveError::InvalidAttribute { section, .. }) if section == "link"
        ));
    }

    #[test]
    fn generic_tree_normalization() {
        let input = yaml_map(
            r"
revert: true
depend: single
setup: [a, b]
file:
  owner: root
  allow_empty: false
  source: {template: motd.erb}
directory:
delete: {proceed: true}
extra: kept
",
        );
        let expected = yaml_map(
            r"
revert: true
depend: [single]
setup: [a, b]
file: {owner: root, template: motd.erb}
directory: {}
delete: {proceed: true}
extra: kept
",
        );
        assert_eq!(normalize(input), expected);
    }

    #[test]
    fn false_top_level_marker_is_dropped() {
        assert!(normalize(yaml_map("revert: false")).is_empty());
    }

    #[test]
    fn validate_rejects_conflicting_sources() {
        let mapping = yaml_map("file: {plain: a, template: b}");
        let err = validate(&mapping).unwrap_err();
        assert!(matches!(err, ResolveError::InvalidAttribute { section, key, .. }
            if section == "file" && key == "template"));
    }

    #[test]
    fn validate_rejects_unknown_keys() {
        assert!(validate(&yaml_map("bogus: 1")).is_err());
        assert!(validate(&yaml_map("file: {bogus: 1}")).is_err());
        assert!(validate(&yaml_map("directory: {dest: x}")).is_err());
        assert!(validate(&yaml_map("setup: [{nested: map}]")).is_err());
    }

    #[test]
    fn validate_accepts_a_complete_manifest() {
        let mapping = yaml_map(
            r"
revert: true
depend: [a]
file: {owner: root, perms: '0644', warning_file: w, comment_line: '# ', plain: motd}
link: {dest: /target, allow_nonexistent_dest: true}
directory: {create: true}
delete: {proceed: true, overwrite_directory: true}
post: [x]
post_once: [y]
",
        );
        validate(&mapping).unwrap();
    }

    #[test]
    fn client_audience_omits_server_setup() {
        let mapping = yaml_map("server_setup: [s]\nsetup: [a]\n");
        let client = to_element(&mapping, "f", Audience::Client).to_xml().unwrap();
        let server = to_element(&mapping, "f", Audience::Server).to_xml().unwrap();
        assert_eq!(
            client,
            r#"<config filename="f"><setup><exec>a</exec></setup></config>"#
        );
        assert!(server.contains("<server_setup><exec>s</exec></server_setup>"));
    }

    #[test]
    fn post_lists_share_one_element_with_once_first() {
        let mapping = yaml_map("post: [p]\npost_once_per_run: [r]\npost_once: [o]\n");
        assert_eq!(
            to_element(&mapping, "f", Audience::Client).to_xml().unwrap(),
            concat!(
                r#"<config filename="f"><post>"#,
                "<exec_once>o</exec_once>",
                "<exec_once_per_run>r</exec_once_per_run>",
                "<exec>p</exec>",
                "</post></config>"
            )
        );
    }

    #[test]
    fn file_sources_are_wrapped_and_link_sources_are_not() {
        let mapping = yaml_map("file: {owner: root, template: t.erb}\nlink: {dest: /x}\n");
        assert_eq!(
            to_element(&mapping, "f", Audience::Client).to_xml().unwrap(),
            concat!(
                r#"<config filename="f">"#,
                "<file><owner>root</owner><source><template>t.erb</template></source></file>",
                "<link><dest>/x</dest></link>",
                "</config>"
            )
        );
    }

    #[test]
    fn false_markers_are_not_emitted() {
        let mapping = yaml_map("directory: {create: false, owner: root}\n");
        assert_eq!(
            to_element(&mapping, "f", Audience::Client).to_xml().unwrap(),
            r#"<config filename="f"><directory><owner>root</owner></directory></config>"#
        );
    }
}
