//! Section and resource-kind tables for resource manifests.
//!
//! Both directions of the resource canonicalizer, strict validation, and the
//! defaults merge all read these tables; nothing else decides which keys are
//! legal or in which order they are emitted.

/// Shape of an attribute inside a resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attr {
    /// Presence-only flag: `true` when present, omitted otherwise.
    Marker,
    /// Single text value.
    Text,
}

/// Legal attributes of one resource kind.
#[derive(Debug)]
pub struct KindSchema {
    /// Kind name (`file`, `link`, …).
    pub name: &'static str,
    /// Ordinary attributes in emission order.
    pub attributes: &'static [(&'static str, Attr)],
    /// Mutually exclusive source kinds.
    pub sources: &'static [&'static str],
    /// Whether source kinds are emitted inside a `<source>` element.
    pub wrap_sources: bool,
}

impl KindSchema {
    /// Shape of an ordinary attribute.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<Attr> {
        self.attributes
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, attr)| *attr)
    }

    /// Whether `key` names one of this kind's source kinds.
    #[must_use]
    pub fn is_source(&self, key: &str) -> bool {
        self.sources.contains(&key)
    }

    /// Whether `key` is legal in this kind at all.
    #[must_use]
    pub fn allows(&self, key: &str) -> bool {
        self.attribute(key).is_some() || self.is_source(key)
    }
}

/// Element name wrapping source kinds.
pub const SOURCE: &str = "source";

/// `file` resources.
pub static FILE: KindSchema = KindSchema {
    name: "file",
    attributes: &[
        ("owner", Attr::Text),
        ("group", Attr::Text),
        ("perms", Attr::Text),
        ("always_manage_metadata", Attr::Marker),
        ("warning_file", Attr::Text),
        ("warning_on_second_line", Attr::Marker),
        ("no_space_around_warning", Attr::Marker),
        ("comment_open", Attr::Text),
        ("comment_line", Attr::Text),
        ("comment_close", Attr::Text),
        ("allow_empty", Attr::Marker),
        ("overwrite_directory", Attr::Marker),
        ("contents", Attr::Text),
    ],
    sources: &["plain", "template", "script"],
    wrap_sources: true,
};

/// `link` resources.
pub static LINK: KindSchema = KindSchema {
    name: "link",
    attributes: &[
        ("owner", Attr::Text),
        ("group", Attr::Text),
        ("perms", Attr::Text),
        ("allow_nonexistent_dest", Attr::Marker),
        ("overwrite_directory", Attr::Marker),
    ],
    sources: &["dest", "script"],
    wrap_sources: false,
};

/// `directory` resources.
pub static DIRECTORY: KindSchema = KindSchema {
    name: "directory",
    attributes: &[
        ("owner", Attr::Text),
        ("group", Attr::Text),
        ("perms", Attr::Text),
        ("create", Attr::Marker),
        ("script", Attr::Text),
    ],
    sources: &[],
    wrap_sources: false,
};

/// `delete` resources.
pub static DELETE: KindSchema = KindSchema {
    name: "delete",
    attributes: &[
        ("overwrite_directory", Attr::Marker),
        ("proceed", Attr::Marker),
        ("script", Attr::Text),
    ],
    sources: &[],
    wrap_sources: false,
};

/// All resource kinds.
pub static KINDS: [&KindSchema; 4] = [&FILE, &LINK, &DIRECTORY, &DELETE];

/// Kinds present in every defaults mapping and every resolved resource
/// manifest, empty when undeclared.
pub const DEFAULTED_KINDS: [&str; 3] = ["file", "link", "directory"];

/// Look up a resource kind by name.
#[must_use]
pub fn kind(name: &str) -> Option<&'static KindSchema> {
    KINDS.iter().copied().find(|k| k.name == name)
}

/// Shape of a top-level key of a canonical resource manifest.
#[derive(Debug, Clone, Copy)]
pub enum Section {
    /// Presence-only flag.
    Marker,
    /// Repeated top-level element accumulating into a list (`<depend>`).
    Repeated,
    /// List fed by `<child>` elements inside a `<section>` element.
    Exec {
        /// Element-tree section element.
        section: &'static str,
        /// Child element name inside the section.
        child: &'static str,
    },
    /// A resource kind sub-mapping.
    Kind(&'static KindSchema),
}

const fn exec(section: &'static str, child: &'static str) -> Section {
    Section::Exec { section, child }
}

/// Top-level canonical keys in emission order.
///
/// `post_once` and `post_once_per_run` precede `post` so that all three are
/// written into one `<post>` element with the once-only commands first.
pub static SECTIONS: [(&str, Section); 15] = [
    ("revert", Section::Marker),
    ("depend", Section::Repeated),
    ("dependcommand", Section::Repeated),
    ("server_setup", exec("server_setup", "exec")),
    ("setup", exec("setup", "exec")),
    ("pre", exec("pre", "exec")),
    ("file", Section::Kind(&FILE)),
    ("link", Section::Kind(&LINK)),
    ("directory", Section::Kind(&DIRECTORY)),
    ("delete", Section::Kind(&DELETE)),
    ("test_before_post", exec("test_before_post", "exec")),
    ("post_once", exec("post", "exec_once")),
    ("post_once_per_run", exec("post", "exec_once_per_run")),
    ("post", exec("post", "exec")),
    ("test", exec("test", "exec")),
];

/// Shape of a canonical top-level key.
#[must_use]
pub fn section(key: &str) -> Option<Section> {
    SECTIONS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, section)| *section)
}

/// Canonical key fed by `<child>` inside `<section>`.
#[must_use]
pub fn exec_key(section: &str, child: &str) -> Option<&'static str> {
    SECTIONS.iter().find_map(|(key, shape)| match shape {
        Section::Exec {
            section: s,
            child: c,
        } if *s == section && *c == child => Some(*key),
        _ => None,
    })
}

/// Whether an element named `name` opens an exec section.
#[must_use]
pub fn is_exec_section(name: &str) -> bool {
    SECTIONS
        .iter()
        .any(|(_, shape)| matches!(shape, Section::Exec { section, .. } if *section == name))
}

/// Whether more than one canonical key feeds the `<section>` element.
///
/// Such a section (`<post>`) holds no empty lists: an empty one has no
/// element-tree form that tells its keys apart.
#[must_use]
pub fn is_shared_section(section: &str) -> bool {
    SECTIONS
        .iter()
        .filter(|(_, shape)| matches!(shape, Section::Exec { section: s, .. } if *s == section))
        .nth(1)
        .is_some()
}

/// Who a manifest is being encoded for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Audience {
    /// A node: server-only sections are omitted.
    #[default]
    Client,
    /// The server itself: every section is kept.
    Server,
}

impl Audience {
    /// Whether `key` is shipped to this audience.
    #[must_use]
    pub fn receives(self, key: &str) -> bool {
        self == Self::Server || key != "server_setup"
    }
}
