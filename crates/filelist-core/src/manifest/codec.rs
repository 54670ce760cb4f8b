//! Reader and writer for `list.xml`.
//!
//! Reading is two-phase: the whole document is walked and checked against the
//! embedded schema into raw records, and descriptors are only built once the
//! document is known to be valid. A bad file therefore never yields a partial
//! list.
use std::fs;
use std::path::{Path, PathBuf};

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::manifest::descriptor::PluginDescriptor;
use crate::manifest::error::ManifestError;

const PLUGINS: &str = "Plugins";
const PLUGIN: &str = "Plugin";
const INSTANCE: &str = "Instance";
const ASSEMBLY: &str = "Assembly";

/// Origin reported for manifests parsed or rendered from memory
const IN_MEMORY: &str = "<memory>";

/// A manifest file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestFile {
    path: PathBuf,
}

impl ManifestFile {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, ManifestError> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(ManifestError::InvalidArgument {
                argument: "path",
                message: "manifest path must not be empty".to_string(),
            });
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Load and validate the manifest, returning descriptors in document order.
    pub fn read(&self) -> Result<Vec<PluginDescriptor>, ManifestError> {
        let bytes = fs::read(&self.path)
            .map_err(|e| ManifestError::io(e, "read_manifest", self.path.clone()))?;
        let content = String::from_utf8(bytes).map_err(|e| {
            ManifestError::validation(self.path.clone(), format!("manifest is not valid UTF-8: {}", e))
        })?;
        parse_manifest(&content, &self.path)
    }

    /// Serialize `descriptors`, replacing whatever is at the path.
    pub fn write(&self, descriptors: &[PluginDescriptor]) -> Result<(), ManifestError> {
        let bytes = render(descriptors).map_err(|message| ManifestError::Serialize {
            path: self.path.clone(),
            message,
        })?;
        fs::write(&self.path, bytes)
            .map_err(|e| ManifestError::io(e, "write_manifest", self.path.clone()))
    }
}

/// Parse manifest text. `origin` is only used in error messages.
pub fn parse_manifest(text: &str, origin: &Path) -> Result<Vec<PluginDescriptor>, ManifestError> {
    let raw_plugins = read_raw_plugins(text, origin)?;
    validate(&raw_plugins, origin)?;

    raw_plugins
        .into_iter()
        .map(|raw| {
            let assembly = raw.assembly.unwrap_or_default();
            PluginDescriptor::new(assembly, raw.instances)
                .map_err(|e| ManifestError::validation(origin, e.to_string()))
        })
        .collect()
}

/// Render descriptors as manifest text.
pub fn render_manifest(descriptors: &[PluginDescriptor]) -> Result<String, ManifestError> {
    let bytes = render(descriptors).map_err(|message| ManifestError::Serialize {
        path: PathBuf::from(IN_MEMORY),
        message,
    })?;
    String::from_utf8(bytes).map_err(|e| ManifestError::Serialize {
        path: PathBuf::from(IN_MEMORY),
        message: e.to_string(),
    })
}

// --- Reading ---

/// A `Plugin` element before validation.
#[derive(Debug, Default)]
struct RawPlugin {
    assembly: Option<String>,
    instances: Vec<String>,
}

/// Element the reader is currently inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Document,
    Plugins,
    Plugin,
    Instance,
}

impl Scope {
    fn element_name(self) -> &'static str {
        match self {
            Scope::Document => "<document>",
            Scope::Plugins => PLUGINS,
            Scope::Plugin => PLUGIN,
            Scope::Instance => INSTANCE,
        }
    }
}

struct RawReader<'a> {
    origin: &'a Path,
    plugins: Vec<RawPlugin>,
    scope: Scope,
    root_seen: bool,
    instance_text: String,
}

fn read_raw_plugins(text: &str, origin: &Path) -> Result<Vec<RawPlugin>, ManifestError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut reader = Reader::from_str(text);
    let mut state = RawReader {
        origin,
        plugins: Vec::new(),
        scope: Scope::Document,
        root_seen: false,
        instance_text: String::new(),
    };

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(source) => {
                return Err(malformed(origin, reader.buffer_position() as u64, source));
            }
        };
        let position = reader.buffer_position() as u64;

        match event {
            Event::Start(element) => state.open(&element, position)?,
            Event::Empty(element) => {
                state.open(&element, position)?;
                state.close();
            }
            Event::End(_) => state.close(),
            Event::Text(text) => {
                let content = text
                    .unescape()
                    .map_err(|e| malformed(origin, position, quick_xml::Error::from(e)))?;
                state.text(&content)?;
            }
            Event::CData(data) => {
                let content = std::str::from_utf8(&data).map_err(|e| {
                    ManifestError::validation(origin, format!("CDATA section is not valid UTF-8: {}", e))
                })?;
                state.text(content)?;
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions and doctypes carry no data.
            _ => {}
        }
    }

    if !state.root_seen {
        return Err(ManifestError::validation(
            origin,
            format!("document has no '{}' root element", PLUGINS),
        ));
    }
    if state.scope != Scope::Document {
        return Err(ManifestError::validation(
            origin,
            format!("document ends inside '{}'", state.scope.element_name()),
        ));
    }
    Ok(state.plugins)
}

impl RawReader<'_> {
    fn open(&mut self, element: &BytesStart<'_>, position: u64) -> Result<(), ManifestError> {
        let name = String::from_utf8_lossy(element.name().as_ref()).into_owned();
        let attributes = read_attributes(element, self.origin, position)?;

        self.scope = match self.scope {
            Scope::Document => {
                if self.root_seen {
                    return Err(ManifestError::validation(
                        self.origin,
                        format!("unexpected second root element '{}'", name),
                    ));
                }
                self.expect_element(&name, PLUGINS)?;
                for (key, _) in &attributes {
                    if !is_namespace_attribute(key) {
                        return Err(self.unexpected_attribute(key, PLUGINS));
                    }
                }
                self.root_seen = true;
                Scope::Plugins
            }
            Scope::Plugins => {
                self.expect_element(&name, PLUGIN)?;
                let mut plugin = RawPlugin::default();
                for (key, value) in attributes {
                    if key == ASSEMBLY {
                        plugin.assembly = Some(value);
                    } else {
                        return Err(self.unexpected_attribute(&key, PLUGIN));
                    }
                }
                self.plugins.push(plugin);
                Scope::Plugin
            }
            Scope::Plugin => {
                self.expect_element(&name, INSTANCE)?;
                if let Some((key, _)) = attributes.first() {
                    return Err(self.unexpected_attribute(key, INSTANCE));
                }
                self.instance_text.clear();
                Scope::Instance
            }
            Scope::Instance => {
                return Err(ManifestError::validation(
                    self.origin,
                    format!("'{}' may only contain text, found element '{}'", INSTANCE, name),
                ));
            }
        };
        Ok(())
    }

    fn close(&mut self) {
        self.scope = match self.scope {
            Scope::Instance => {
                let text = std::mem::take(&mut self.instance_text);
                if let Some(plugin) = self.plugins.last_mut() {
                    plugin.instances.push(text);
                }
                Scope::Plugin
            }
            Scope::Plugin => Scope::Plugins,
            Scope::Plugins | Scope::Document => Scope::Document,
        };
    }

    fn text(&mut self, content: &str) -> Result<(), ManifestError> {
        if self.scope == Scope::Instance {
            self.instance_text.push_str(content);
            return Ok(());
        }
        if content.trim().is_empty() {
            return Ok(());
        }
        Err(ManifestError::validation(
            self.origin,
            format!(
                "unexpected text '{}' inside '{}'",
                content.trim(),
                self.scope.element_name()
            ),
        ))
    }

    fn expect_element(&self, found: &str, expected: &str) -> Result<(), ManifestError> {
        if found == expected {
            return Ok(());
        }
        Err(ManifestError::validation(
            self.origin,
            format!(
                "expected element '{}' inside '{}', found '{}'",
                expected,
                self.scope.element_name(),
                found
            ),
        ))
    }

    fn unexpected_attribute(&self, key: &str, element: &str) -> ManifestError {
        ManifestError::validation(
            self.origin,
            format!("attribute '{}' is not allowed on '{}'", key, element),
        )
    }
}

fn read_attributes(
    element: &BytesStart<'_>,
    origin: &Path,
    position: u64,
) -> Result<Vec<(String, String)>, ManifestError> {
    element
        .attributes()
        .map(|attribute| {
            let attribute =
                attribute.map_err(|e| malformed(origin, position, quick_xml::Error::from(e)))?;
            let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
            let value = attribute
                .unescape_value()
                .map_err(|e| malformed(origin, position, quick_xml::Error::from(e)))?
                .into_owned();
            Ok((key, value))
        })
        .collect()
}

fn is_namespace_attribute(key: &str) -> bool {
    key == "xmlns" || key.starts_with("xmlns:") || key.starts_with("xsi:")
}

fn validate(plugins: &[RawPlugin], origin: &Path) -> Result<(), ManifestError> {
    for (index, plugin) in plugins.iter().enumerate() {
        let number = index + 1;
        let assembly = match plugin.assembly.as_deref() {
            None => {
                return Err(ManifestError::validation(
                    origin,
                    format!("'{}' #{} is missing the required '{}' attribute", PLUGIN, number, ASSEMBLY),
                ));
            }
            Some("") => {
                return Err(ManifestError::validation(
                    origin,
                    format!("'{}' #{} has an empty '{}' attribute", PLUGIN, number, ASSEMBLY),
                ));
            }
            Some(assembly) => assembly,
        };

        if plugin.instances.is_empty() {
            return Err(ManifestError::validation(
                origin,
                format!("'{}' '{}' declares no '{}' elements", PLUGIN, assembly, INSTANCE),
            ));
        }
        if let Some(position) = plugin.instances.iter().position(|text| text.is_empty()) {
            return Err(ManifestError::validation(
                origin,
                format!(
                    "'{}' '{}' has an empty '{}' element (#{})",
                    PLUGIN,
                    assembly,
                    INSTANCE,
                    position + 1
                ),
            ));
        }
    }
    Ok(())
}

fn malformed(origin: &Path, position: u64, source: quick_xml::Error) -> ManifestError {
    ManifestError::Malformed {
        path: origin.to_path_buf(),
        position,
        source,
    }
}

// --- Writing ---

fn render(descriptors: &[PluginDescriptor]) -> Result<Vec<u8>, String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b'\t', 1);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), Some("no"))))
        .map_err(|e| e.to_string())?;
    writer
        .write_event(Event::Start(BytesStart::new(PLUGINS)))
        .map_err(|e| e.to_string())?;

    for descriptor in descriptors {
        let plugin = BytesStart::new(PLUGIN).with_attributes([(ASSEMBLY, descriptor.library_id())]);
        writer
            .write_event(Event::Start(plugin))
            .map_err(|e| e.to_string())?;

        for type_name in descriptor.type_names() {
            writer
                .write_event(Event::Start(BytesStart::new(INSTANCE)))
                .map_err(|e| e.to_string())?;
            writer
                .write_event(Event::Text(BytesText::new(type_name)))
                .map_err(|e| e.to_string())?;
            writer
                .write_event(Event::End(BytesEnd::new(INSTANCE)))
                .map_err(|e| e.to_string())?;
        }

        writer
            .write_event(Event::End(BytesEnd::new(PLUGIN)))
            .map_err(|e| e.to_string())?;
    }

    writer
        .write_event(Event::End(BytesEnd::new(PLUGINS)))
        .map_err(|e| e.to_string())?;

    let mut bytes = writer.into_inner();
    bytes.push(b'\n');
    Ok(bytes)
}
